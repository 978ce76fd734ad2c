//! The patch pipeline and its worker pool.
//!
//! ```text
//! probe ─► target version ─► locate + best_match ─► classpath ─► javac ─► patch
//! ```

mod pool;
mod runner;

pub use pool::{JobHandle, PatchService};
pub use runner::{PatchJob, PatchReport, Pipeline, Resolution};
