//! Batch command implementation.
//!
//! Reads a JSON list of jobs and runs them on the worker pool:
//!
//! ```json
//! [
//!   { "archive": "plugins/A.jar", "class": "com.example.Main", "source": "Main.java" },
//!   { "archive": "plugins/B.jar", "class": "org.demo.Hook", "source": "Hook.java",
//!     "classpath": ["extra/gson.jar"] }
//! ]
//! ```
//!
//! Relative paths are resolved against the directory of the job list.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use jarsmith_core::{PatchJob, PatchService, Pipeline, PipelineConfig};
use serde::Deserialize;

use crate::colors;
use crate::patch::{print_report, read_source};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchEntry {
    archive: PathBuf,
    class: String,
    source: PathBuf,
    #[serde(default)]
    classpath: Vec<PathBuf>,
}

/// Run every job in `jobs_path`.
pub fn execute(
    mut config: PipelineConfig,
    jobs_path: &Path,
    workers: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let jobs = load_jobs(jobs_path)?;

    if let Some(workers) = workers {
        config.workers = workers;
    }
    let service = PatchService::new(Pipeline::new(config)?)?;
    let results = service.run_all(&jobs);

    let failures = results.iter().filter(|r| r.is_err()).count();

    if json {
        let rendered: Vec<_> = results
            .iter()
            .map(|result| match result {
                Ok(report) => serde_json::json!({ "ok": report }),
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        for (job, result) in jobs.iter().zip(&results) {
            println!(
                "\n{}{}{} {}",
                colors::BOLD,
                job.archive.display(),
                colors::RESET,
                job.class_name
            );
            match result {
                Ok(report) => print_report(report),
                Err(e) => println!("{}{}{}", colors::RED, e.with_hint(), colors::RESET),
            }
        }
        println!("\n{}", "─".repeat(50));
        println!(
            "{}Completed{} {} jobs in {:.2}s ({} failed)",
            if failures == 0 { colors::GREEN } else { colors::YELLOW },
            colors::RESET,
            jobs.len(),
            start.elapsed().as_secs_f64(),
            failures
        );
    }

    if failures > 0 {
        anyhow::bail!("{} of {} jobs failed", failures, jobs.len());
    }
    Ok(())
}

fn load_jobs(jobs_path: &Path) -> anyhow::Result<Vec<PatchJob>> {
    let text = std::fs::read_to_string(jobs_path)
        .with_context(|| format!("Failed to read job list {}", jobs_path.display()))?;
    let entries: Vec<BatchEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid job list {}", jobs_path.display()))?;

    let base = jobs_path.parent().unwrap_or(Path::new("."));
    entries
        .into_iter()
        .map(|entry| {
            let source_text = read_source(&base.join(&entry.source))?;
            let classpath = entry.classpath.iter().map(|p| base.join(p)).collect();
            Ok(PatchJob::new(base.join(&entry.archive), entry.class, source_text)
                .with_classpath(classpath))
        })
        .collect()
}
