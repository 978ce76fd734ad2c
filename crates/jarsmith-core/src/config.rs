//! Pipeline configuration.
//!
//! Every field has a default, so a partial JSON file (or none at all) is a
//! valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::version::Version;

/// Default number of concurrent patch jobs.
pub const DEFAULT_WORKERS: usize = 4;

/// Logical name of the bundled dependency directory.
pub const DEFAULT_BUNDLE_DIR_NAME: &str = "libs";

/// Token inserted before the extension of a patched archive.
pub const DEFAULT_OUTPUT_MARKER: &str = "_PATCHED";

/// Configuration for the patch pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Size of the worker pool used for concurrent patch jobs.
    pub workers: usize,

    /// Explicit path to `javac`; discovered from `JAVA_HOME`/`PATH` if unset.
    pub javac: Option<PathBuf>,

    /// Explicit path to a bundled dependency archive or directory.
    pub bundle: Option<PathBuf>,

    /// Directory searched for the bundle instead of the executable's directory.
    pub resource_root: Option<PathBuf>,

    /// Logical name of the bundled dependency directory.
    pub bundle_dir_name: String,

    /// Case-insensitive substrings identifying dependency artifacts.
    pub marker_keywords: Vec<String>,

    /// Directories searched when the bundle yields nothing.
    pub fallback_dirs: Vec<PathBuf>,

    /// Extra JARs or directories of JARs appended to every classpath.
    pub extra_roots: Vec<PathBuf>,

    /// Also append entries from the `CLASSPATH` environment variable.
    pub use_env_classpath: bool,

    /// Targets below this version compile with `-source 8 -target 8`.
    pub legacy_threshold: Version,

    /// Target version used when detection fails.
    pub default_target: Version,

    /// Token inserted before the extension of patched archives.
    pub output_marker: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            javac: None,
            bundle: None,
            resource_root: None,
            bundle_dir_name: DEFAULT_BUNDLE_DIR_NAME.to_string(),
            marker_keywords: ["spigot", "bukkit", "api"]
                .into_iter()
                .map(String::from)
                .collect(),
            fallback_dirs: Vec::new(),
            extra_roots: Vec::new(),
            use_env_classpath: false,
            legacy_threshold: Version::new(1, 17, 0),
            default_target: Version::new(1, 20, 0),
            output_marker: DEFAULT_OUTPUT_MARKER.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid JSON in {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration at `path`, or the default location when `None`.
    ///
    /// A missing default file yields the default configuration; an explicit
    /// path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = config_path();
                if default_path.is_file() {
                    tracing::debug!("Loading configuration from {}", default_path.display());
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.output_marker.is_empty() {
            return Err(Error::Config("output-marker must not be empty".to_string()));
        }
        Ok(())
    }

    /// Whether a file name contains one of the marker keywords.
    pub fn has_marker_keyword(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.marker_keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_lowercase()))
    }
}

/// Path of the default configuration file.
///
/// Uses `$XDG_CONFIG_HOME/jarsmith/config.json` if set, otherwise the
/// platform config directory, or `./jarsmith/config.json` if neither exists.
pub fn config_path() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::config_dir())
        .join("config.json")
}

/// Per-user data directory, used for the fallback `libs` location.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("jarsmith"))
}

fn config_dir_with_env(xdg_config_home: Option<String>, config_dir: Option<PathBuf>) -> PathBuf {
    xdg_config_home
        .map(PathBuf::from)
        .or(config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jarsmith")
}
