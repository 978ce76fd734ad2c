//! Dependency artifact discovery.
//!
//! Sources, in order:
//!
//! 1. the bundled `libs` directory (`libs.zip` unpacked on first use, or a
//!    plain directory)
//! 2. fallback directories, only when the bundle yields nothing
//! 3. `.jar` files beside the input archive
//!
//! The first two are memoized in a [`DependencyCache`] shared by every
//! pipeline run in the process.

mod bundle;
mod cache;
mod locator;

pub use cache::{DependencyCache, DependencyMap};
pub use locator::{DependencyLocator, LocatedDependencies};
