//! Version parsing and best-match ranking for dependency artifacts.
//!
//! Versions are the `major.minor[.patch]` triples used by the target server
//! platform (e.g. `1.20.4`). They are parsed out of file names and
//! descriptor values, then used to rank candidate API JARs against the
//! version a plugin targets.
//!
//! # Ranking
//!
//! ```text
//! candidates ──► exact match? ──► compatible? ──► priority score ──► newest
//!                 (first)          (next)          (ascending)       (tie-break)
//! ```

mod parse;
mod rank;
mod types;

pub use parse::parse;
pub use rank::{best_match, newest, rank, Candidate};
pub use types::{ParseVersionError, Version};
