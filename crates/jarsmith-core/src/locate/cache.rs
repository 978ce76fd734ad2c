//! Process-wide memo of discovered dependency artifacts.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempfile::TempDir;

/// Dependency artifacts keyed by file name.
pub type DependencyMap = BTreeMap<String, PathBuf>;

#[derive(Default)]
struct CacheState {
    /// Memoized scan result; only ever set to a non-empty map.
    entries: Option<Arc<DependencyMap>>,
    /// Directory holding files unpacked from a bundle archive.
    extraction: Option<TempDir>,
}

/// Shared memo of the bundle and fallback-directory scan.
///
/// The lock is held for the whole scan, so concurrent first uses collapse to
/// a single scan and every caller sees the same result. Once populated the
/// map is never modified. Files extracted from a bundle archive live as long
/// as the cache.
#[derive(Default)]
pub struct DependencyCache {
    state: Mutex<CacheState>,
}

impl DependencyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized map, running `scan` if nothing is cached yet.
    ///
    /// `scan` receives the cache's extraction slot so unpacked files share
    /// the cache's lifetime. An empty result is returned but not memoized.
    pub fn get_or_scan<F>(&self, scan: F) -> Arc<DependencyMap>
    where
        F: FnOnce(&mut Option<TempDir>) -> DependencyMap,
    {
        let mut state = self.acquire_lock();

        if let Some(entries) = &state.entries {
            tracing::debug!("Using {} cached dependency artifacts", entries.len());
            return Arc::clone(entries);
        }

        let entries = Arc::new(scan(&mut state.extraction));
        if !entries.is_empty() {
            state.entries = Some(Arc::clone(&entries));
        }
        entries
    }

    /// The memoized map, if a scan has found anything.
    pub fn snapshot(&self) -> Option<Arc<DependencyMap>> {
        self.acquire_lock().entries.clone()
    }

    /// A scan that panicked never stored a result, so a poisoned lock still
    /// guards consistent state.
    fn acquire_lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DependencyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.acquire_lock();
        f.debug_struct("DependencyCache")
            .field("entries", &state.entries.as_ref().map(|e| e.len()))
            .field(
                "extraction",
                &state.extraction.as_ref().map(|dir| dir.path().to_path_buf()),
            )
            .finish()
    }
}
