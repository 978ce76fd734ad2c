//! Archive-wide string constant replacement.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::class_file;
use super::patcher::rewrite_archive;
use crate::error::{Error, Result};
use crate::paths;

/// Result of a string replacement pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringPatch {
    pub path: PathBuf,
    /// Class entries that contained the string.
    pub classes_changed: usize,
    /// String constants rewritten across all classes.
    pub constants_replaced: usize,
    /// Class entries that could not be parsed and were copied unchanged.
    pub skipped: Vec<String>,
}

/// Rewrites string constants in every `.class` entry of an archive.
///
/// Non-class entries and classes without a match are copied raw. Output
/// goes through the same staged rename as [`super::ArchivePatcher`].
#[derive(Debug, Clone)]
pub struct StringReplacer {
    output_marker: String,
}

impl Default for StringReplacer {
    fn default() -> Self {
        Self::new(paths::STRING_PATCH_MARKER)
    }
}

impl StringReplacer {
    pub fn new(output_marker: impl Into<String>) -> Self {
        Self {
            output_marker: output_marker.into(),
        }
    }

    pub fn output_path(&self, source: &Path) -> PathBuf {
        paths::patched_output_path(source, &self.output_marker)
    }

    /// Replace `from` with `to`, writing to the default output path.
    pub fn replace(&self, source: &Path, from: &str, to: &str) -> Result<StringPatch> {
        let output = self.output_path(source);
        self.replace_to(source, &output, from, to)
    }

    /// Replace `from` with `to` in every class of `source`, writing to `output`.
    pub fn replace_to(
        &self,
        source: &Path,
        output: &Path,
        from: &str,
        to: &str,
    ) -> Result<StringPatch> {
        if from.is_empty() {
            return Err(Error::Config(
                "the string to replace must not be empty".to_string(),
            ));
        }

        let mut classes_changed = 0;
        let mut constants_replaced = 0;
        let mut skipped = Vec::new();

        rewrite_archive(source, output, |archive, index| {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| Error::archive(source, e))?;
            if !entry.name().ends_with(".class") {
                return Ok(None);
            }
            let name = entry.name().to_string();
            let mut class = Vec::new();
            entry
                .read_to_end(&mut class)
                .map_err(|e| Error::archive(source, e))?;

            match class_file::replace_string_constants(&class, from, to) {
                Ok(Some(rewrite)) => {
                    tracing::debug!("Replaced {} constants in {}", rewrite.replaced, name);
                    classes_changed += 1;
                    constants_replaced += rewrite.replaced;
                    Ok(Some(rewrite.bytes))
                }
                Ok(None) => Ok(None),
                Err(e) => {
                    tracing::warn!("Copying {} unchanged: {}", name, e);
                    skipped.push(name);
                    Ok(None)
                }
            }
        })?;

        if classes_changed == 0 {
            tracing::warn!(
                "No string constant in {} contains {:?}; wrote an unmodified copy to {}",
                source.display(),
                from,
                output.display()
            );
        } else {
            tracing::info!(
                "Replaced {} string constants in {} classes into {}",
                constants_replaced,
                classes_changed,
                output.display()
            );
        }

        Ok(StringPatch {
            path: output.to_path_buf(),
            classes_changed,
            constants_replaced,
            skipped,
        })
    }
}
