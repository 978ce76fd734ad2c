//! The bundled dependency directory, packaged as `libs.zip` or shipped as a
//! plain `libs/` directory.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::archive::reader;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::paths;

/// Where the bundled dependencies were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BundleSource {
    /// A zip archive that must be unpacked before use.
    Archive(PathBuf),
    /// A directory read in place.
    Directory(PathBuf),
}

/// Locate the bundle.
///
/// An explicitly configured bundle is the only one considered. Otherwise the
/// resource root and then the executable's directory are searched for
/// `<name>.zip` and `<name>/`.
pub(crate) fn find_bundle(config: &PipelineConfig) -> Option<BundleSource> {
    if let Some(bundle) = &config.bundle {
        return classify(bundle).or_else(|| {
            tracing::warn!("Configured bundle {} does not exist", bundle.display());
            None
        });
    }

    let name = &config.bundle_dir_name;
    let roots = config
        .resource_root
        .iter()
        .cloned()
        .chain(paths::executable_dir());

    for root in roots {
        let archive = root.join(format!("{name}.zip"));
        if archive.is_file() {
            return Some(BundleSource::Archive(archive));
        }
        let directory = root.join(name);
        if directory.is_dir() {
            return Some(BundleSource::Directory(directory));
        }
    }
    None
}

fn classify(path: &Path) -> Option<BundleSource> {
    if path.is_file() {
        Some(BundleSource::Archive(path.to_path_buf()))
    } else if path.is_dir() {
        Some(BundleSource::Directory(path.to_path_buf()))
    } else {
        None
    }
}

/// Dependency JARs provided by the bundle.
///
/// Archive bundles are unpacked into `extraction`, which is created on first
/// use. Failures are logged and yield an empty list.
pub(crate) fn bundle_jars(
    source: &BundleSource,
    extraction: &mut Option<TempDir>,
    config: &PipelineConfig,
) -> Vec<PathBuf> {
    let result = match source {
        BundleSource::Directory(dir) => Ok(dependency_jars_in(dir, config)),
        BundleSource::Archive(archive) => extract(archive, extraction, config),
    };
    result.unwrap_or_else(|e| {
        tracing::warn!("Bundled dependencies unavailable: {}", e);
        Vec::new()
    })
}

/// JAR files directly inside `dir` whose names carry a marker keyword,
/// sorted by file name.
pub(crate) fn dependency_jars_in(dir: &Path, config: &PipelineConfig) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut jars: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| is_dependency_jar(&name.to_string_lossy(), config))
                .unwrap_or(false)
        })
        .collect();
    jars.sort();
    jars
}

/// Whether `file_name` is a `.jar` carrying one of the marker keywords.
pub(crate) fn is_dependency_jar(file_name: &str, config: &PipelineConfig) -> bool {
    is_jar(file_name) && config.has_marker_keyword(file_name)
}

pub(crate) fn is_jar(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".jar")
}

fn extract(
    archive_path: &Path,
    extraction: &mut Option<TempDir>,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>> {
    if extraction.is_none() {
        *extraction = Some(paths::scratch_dir("jarsmith-libs-")?);
    }
    let Some(target_dir) = extraction.as_ref().map(|dir| dir.path().to_path_buf()) else {
        return Ok(Vec::new());
    };

    tracing::info!(
        "Unpacking bundled dependencies from {} into {}",
        archive_path.display(),
        target_dir.display()
    );

    let mut archive = reader::open(archive_path)?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::archive(archive_path, e))?;
        if entry.is_dir() {
            continue;
        }

        let Some(file_name) = entry.name().rsplit('/').next().map(str::to_string) else {
            continue;
        };
        if file_name.is_empty() || !is_dependency_jar(&file_name, config) {
            continue;
        }

        let target = target_dir.join(&file_name);
        if !target.exists() {
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            tracing::debug!("Extracted {}", file_name);
        }
        if !extracted.contains(&target) {
            extracted.push(target);
        }
    }

    extracted.sort();
    Ok(extracted)
}
