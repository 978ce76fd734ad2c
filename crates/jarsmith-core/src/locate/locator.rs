//! Discovery of dependency artifacts for a plugin archive.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use super::bundle::{self, BundleSource};
use super::cache::{DependencyCache, DependencyMap};
use crate::config::{self, PipelineConfig};
use crate::paths;
use crate::version::{self, Candidate, Version};

/// Artifacts found for one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedDependencies {
    /// Dependency artifacts keyed by file name; first found wins.
    pub candidates: DependencyMap,
    /// Every `.jar` beside the input archive, excluding the input itself and
    /// earlier patch outputs.
    pub siblings: Vec<PathBuf>,
}

impl LocatedDependencies {
    /// Candidate paths in file-name order.
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        self.candidates.values().cloned().collect()
    }

    /// Candidates whose file names carry a version.
    pub fn versioned_candidates(&self) -> Vec<Candidate> {
        self.candidates
            .values()
            .filter_map(|path| Candidate::from_path(path.clone()))
            .collect()
    }

    /// The dependency to compile against: the best match for `target`, or the
    /// newest candidate when none carries a version.
    pub fn select(&self, target: &Version) -> Option<PathBuf> {
        let versioned = self.versioned_candidates();
        if let Some(best) = version::best_match(&versioned, target) {
            return Some(best.path.clone());
        }
        let paths = self.candidate_paths();
        version::newest(&paths).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.siblings.is_empty()
    }
}

/// Finds dependency artifacts from the bundle, fallback directories and the
/// directory of the input archive.
///
/// The bundle and fallback results are memoized in the shared
/// [`DependencyCache`]; siblings are scanned on every call.
#[derive(Debug, Clone)]
pub struct DependencyLocator {
    config: PipelineConfig,
    cache: Arc<DependencyCache>,
}

impl DependencyLocator {
    pub fn new(config: PipelineConfig, cache: Arc<DependencyCache>) -> Self {
        Self { config, cache }
    }

    /// Discover dependencies for `archive`. Never fails; unavailable sources
    /// are logged and skipped.
    pub fn locate(&self, archive: &Path) -> LocatedDependencies {
        let shared = self
            .cache
            .get_or_scan(|extraction| self.scan_shared_sources(extraction));
        let mut candidates = (*shared).clone();

        let siblings = self.sibling_jars(archive);
        for sibling in &siblings {
            let Some(name) = sibling.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };
            if self.config.has_marker_keyword(&name) {
                candidates.entry(name).or_insert_with(|| sibling.clone());
            }
        }

        tracing::info!(
            "Found {} dependency candidates and {} sibling archives",
            candidates.len(),
            siblings.len()
        );
        LocatedDependencies {
            candidates,
            siblings,
        }
    }

    fn scan_shared_sources(&self, extraction: &mut Option<TempDir>) -> DependencyMap {
        let mut found = DependencyMap::new();

        match bundle::find_bundle(&self.config) {
            Some(source) => {
                let label = match &source {
                    BundleSource::Archive(path) | BundleSource::Directory(path) => {
                        path.display().to_string()
                    }
                };
                let jars = bundle::bundle_jars(&source, extraction, &self.config);
                tracing::debug!("Bundle {} provided {} artifacts", label, jars.len());
                insert_all(&mut found, jars);
            }
            None => tracing::debug!("No dependency bundle found"),
        }

        if !found.is_empty() {
            return found;
        }

        for dir in self.fallback_dirs() {
            let jars = bundle::dependency_jars_in(&dir, &self.config);
            if !jars.is_empty() {
                tracing::info!("Using dependencies from {}", dir.display());
                insert_all(&mut found, jars);
                break;
            }
        }

        if found.is_empty() {
            tracing::warn!("No bundled or fallback dependency artifacts found");
        }
        found
    }

    /// Fallback directories in search order, configured ones first.
    pub fn fallback_dirs(&self) -> Vec<PathBuf> {
        let name = &self.config.bundle_dir_name;
        let mut search: Vec<PathBuf> = self.config.fallback_dirs.clone();

        search.push(PathBuf::from(".").join(name));
        if let Ok(cwd) = std::env::current_dir() {
            search.push(cwd.join(name));
        }
        if let Some(data) = config::data_dir() {
            search.push(data.join(name));
        }
        if let Some(home) = dirs::home_dir() {
            search.push(home.join(".jarsmith").join(name));
        }

        let mut unique = Vec::with_capacity(search.len());
        for dir in search {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        unique
    }

    /// `.jar` files beside `archive`, sorted by name.
    fn sibling_jars(&self, archive: &Path) -> Vec<PathBuf> {
        let dir = paths::parent_dir(archive);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let own_name = archive.file_name();
        let mut siblings: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                let Some(name) = path.file_name() else {
                    return false;
                };
                let name_str = name.to_string_lossy();
                Some(name) != own_name
                    && bundle::is_jar(&name_str)
                    && !paths::is_patch_output(&name_str, &self.config.output_marker)
            })
            .collect();
        siblings.sort();
        siblings
    }
}

fn insert_all(found: &mut DependencyMap, jars: Vec<PathBuf>) {
    for jar in jars {
        if let Some(name) = jar.file_name().map(|n| n.to_string_lossy().into_owned()) {
            found.entry(name).or_insert(jar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(config: PipelineConfig) -> DependencyLocator {
        DependencyLocator::new(config, Arc::new(DependencyCache::new()))
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), "").unwrap();
        }
    }

    #[test]
    fn test_bundle_directory_is_used_first() {
        let temp = TempDir::new().unwrap();
        let bundle = temp.path().join("libs");
        let fallback = temp.path().join("fallback");
        let plugins = temp.path().join("plugins");
        for dir in [&bundle, &fallback, &plugins] {
            fs::create_dir(dir).unwrap();
        }
        touch(&bundle, &["spigot-api-1.20.jar"]);
        touch(&fallback, &["spigot-api-1.16.jar"]);
        touch(&plugins, &["MyPlugin.jar"]);

        let located = locator(PipelineConfig {
            bundle: Some(bundle.clone()),
            fallback_dirs: vec![fallback],
            ..Default::default()
        })
        .locate(&plugins.join("MyPlugin.jar"));

        assert_eq!(
            located.candidate_paths(),
            vec![bundle.join("spigot-api-1.20.jar")]
        );
    }

    #[test]
    fn test_first_fallback_with_matches_wins() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty");
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        for dir in [&empty, &first, &second] {
            fs::create_dir(dir).unwrap();
        }
        touch(&empty, &["notes.txt"]);
        touch(&first, &["bukkit-1.12.jar"]);
        touch(&second, &["spigot-1.20.jar"]);

        let located = locator(PipelineConfig {
            bundle: Some(temp.path().join("missing.zip")),
            fallback_dirs: vec![empty, first.clone(), second],
            ..Default::default()
        })
        .locate(&temp.path().join("MyPlugin.jar"));

        assert_eq!(
            located.candidate_paths(),
            vec![first.join("bukkit-1.12.jar")]
        );
    }

    #[test]
    fn test_siblings_exclude_self_and_patch_outputs() {
        let temp = TempDir::new().unwrap();
        let libs = temp.path().join("libs");
        let plugins = temp.path().join("plugins");
        fs::create_dir(&libs).unwrap();
        fs::create_dir(&plugins).unwrap();
        touch(&libs, &["spigot-api-1.20.jar"]);
        touch(
            &plugins,
            &[
                "MyPlugin.jar",
                "MyPlugin_PATCHED.jar",
                "Other_STRING_PATCHED.jar",
                "Vault.jar",
                "bukkit-1.8.8.jar",
                "config.yml",
            ],
        );

        let located = locator(PipelineConfig {
            bundle: Some(libs.clone()),
            ..Default::default()
        })
        .locate(&plugins.join("MyPlugin.jar"));

        assert_eq!(
            located.siblings,
            vec![plugins.join("Vault.jar"), plugins.join("bukkit-1.8.8.jar")]
        );
        assert_eq!(
            located.candidate_paths(),
            vec![
                plugins.join("bukkit-1.8.8.jar"),
                libs.join("spigot-api-1.20.jar"),
            ]
        );
    }

    #[test]
    fn test_cached_result_survives_source_removal() {
        let temp = TempDir::new().unwrap();
        let libs = temp.path().join("libs");
        fs::create_dir(&libs).unwrap();
        touch(&libs, &["spigot-api-1.20.jar"]);

        let cache = Arc::new(DependencyCache::new());
        let locator = DependencyLocator::new(
            PipelineConfig {
                bundle: Some(libs.clone()),
                ..Default::default()
            },
            Arc::clone(&cache),
        );

        let first = locator.locate(&temp.path().join("a.jar"));
        fs::remove_file(libs.join("spigot-api-1.20.jar")).unwrap();
        let second = locator.locate(&temp.path().join("a.jar"));

        assert_eq!(first.candidates, second.candidates);
        assert!(cache.snapshot().is_some());
    }

    #[test]
    fn test_select_prefers_best_match_then_newest() {
        let mut located = LocatedDependencies::default();
        for name in ["spigot-api-1.16.jar", "spigot-api-1.20.jar", "spigot-api-1.23.jar"] {
            located
                .candidates
                .insert(name.to_string(), PathBuf::from("/libs").join(name));
        }

        assert_eq!(
            located.select(&Version::new(1, 20, 0)),
            Some(PathBuf::from("/libs/spigot-api-1.20.jar"))
        );

        let mut unversioned = LocatedDependencies::default();
        unversioned
            .candidates
            .insert("spigot-api.jar".to_string(), PathBuf::from("/libs/spigot-api.jar"));
        assert_eq!(
            unversioned.select(&Version::new(1, 20, 0)),
            Some(PathBuf::from("/libs/spigot-api.jar"))
        );
    }

    #[test]
    fn test_fallback_dirs_start_with_configured() {
        let locator = locator(PipelineConfig {
            fallback_dirs: vec![PathBuf::from("/srv/libs")],
            ..Default::default()
        });

        let dirs = locator.fallback_dirs();
        assert_eq!(dirs[0], PathBuf::from("/srv/libs"));
        assert!(dirs.contains(&PathBuf::from("./libs")));
    }
}
