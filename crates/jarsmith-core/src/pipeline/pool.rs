//! Concurrent patch jobs on a bounded worker pool.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::runner::{PatchJob, PatchReport, Pipeline};
use crate::error::{Error, Result};

/// Runs patch jobs on a fixed-size thread pool sharing one [`Pipeline`].
///
/// Every job yields exactly one result, even if the job panics.
pub struct PatchService {
    pipeline: Arc<Pipeline>,
    pool: ThreadPool,
}

/// Pending result of a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    receiver: mpsc::Receiver<Result<PatchReport>>,
}

impl JobHandle {
    /// Block until the job finishes.
    pub fn wait(self) -> Result<PatchReport> {
        self.receiver.recv().map_err(|_| {
            Error::WorkerPool("worker exited before reporting a result".to_string())
        })?
    }
}

impl PatchService {
    /// Create a service with `pipeline.config().workers` threads.
    pub fn new(pipeline: Pipeline) -> Result<Self> {
        let workers = pipeline.config().workers;
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("jarsmith-worker-{index}"))
            .panic_handler(|_| tracing::error!("Patch worker panicked"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        tracing::debug!("Started patch pool with {} workers", workers);
        Ok(Self {
            pipeline: Arc::new(pipeline),
            pool,
        })
    }

    /// Queue a job and return a handle to its result.
    pub fn submit(&self, job: PatchJob) -> JobHandle {
        let (sender, receiver) = mpsc::channel();
        let pipeline = Arc::clone(&self.pipeline);
        self.pool.spawn(move || {
            // The receiver may already be gone; the result is then unwanted.
            let _ = sender.send(run_job(&pipeline, &job));
        });
        JobHandle { receiver }
    }

    /// Run every job concurrently; results are in job order.
    pub fn run_all(&self, jobs: &[PatchJob]) -> Vec<Result<PatchReport>> {
        tracing::info!("Running {} patch jobs", jobs.len());
        self.pool.install(|| {
            jobs.par_iter()
                .map(|job| run_job(&self.pipeline, job))
                .collect()
        })
    }
}

fn run_job(pipeline: &Pipeline, job: &PatchJob) -> Result<PatchReport> {
    panic::catch_unwind(AssertUnwindSafe(|| pipeline.patch(job))).unwrap_or_else(|_| {
        Err(Error::WorkerPool(format!(
            "job for {} panicked",
            job.archive.display()
        )))
    })
}
