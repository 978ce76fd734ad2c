//! Path conventions shared by the pipeline stages.
//!
//! Patched archives are written next to their input:
//!
//! ```text
//! plugins/
//! ├── MyPlugin.jar                  # input, never modified
//! ├── MyPlugin_PATCHED.jar          # recompiled class, overwritten by each patch
//! └── MyPlugin_STRING_PATCHED.jar   # string constants replaced
//! ```

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

/// Token inserted before the extension of string-replaced archives.
pub const STRING_PATCH_MARKER: &str = "_STRING_PATCHED";

/// Name fragments that identify archives produced by earlier patches.
const PATCH_OUTPUT_MARKERS: &[&str] = &["_PATCHED", STRING_PATCH_MARKER];

/// Output path for a patched archive: `<stem><marker><ext>` beside `input`.
///
/// # Arguments
/// * `input` - Path to the original archive (e.g. `plugins/MyPlugin.jar`)
/// * `marker` - Token inserted before the extension (e.g. `_PATCHED`)
pub fn patched_output_path(input: &Path, marker: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}{marker}.{}", ext.to_string_lossy()),
        None => format!("{stem}{marker}"),
    };
    input.with_file_name(file_name)
}

/// Whether `file_name` looks like the output of an earlier patch.
pub fn is_patch_output(file_name: &str, marker: &str) -> bool {
    file_name.contains(marker)
        || PATCH_OUTPUT_MARKERS
            .iter()
            .any(|known| file_name.contains(known))
}

/// Directory containing `path`, treating a bare file name as the current directory.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Create a scratch directory removed when the guard drops.
pub fn scratch_dir(prefix: &str) -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}

/// Directory of the running executable, if it can be determined.
pub fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}
