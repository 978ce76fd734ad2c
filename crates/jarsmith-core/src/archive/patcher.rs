//! Atomic entry rewriting in zip archives.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::reader::{self, ArchiveReader};
use crate::error::{Error, Result};
use crate::paths;

/// Result of a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchedArchive {
    /// Where the patched archive was written.
    pub path: PathBuf,
    /// Whether an entry with the requested name existed and was replaced.
    pub replaced: bool,
}

/// Writes a copy of an archive with one entry's contents replaced.
///
/// Entries keep their order; every entry other than the replaced one is
/// copied without recompression. The output is assembled in a temporary file
/// in the destination directory and renamed into place, so a failed patch
/// leaves both the source and any earlier output untouched.
#[derive(Debug, Clone)]
pub struct ArchivePatcher {
    output_marker: String,
}

impl ArchivePatcher {
    pub fn new(output_marker: impl Into<String>) -> Self {
        Self {
            output_marker: output_marker.into(),
        }
    }

    /// Output path for `source`: `<stem><marker><ext>` beside it.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        paths::patched_output_path(source, &self.output_marker)
    }

    /// Replace `entry_name` in `source`, writing to the default output path.
    pub fn patch(&self, source: &Path, entry_name: &str, bytes: &[u8]) -> Result<PatchedArchive> {
        let output = self.output_path(source);
        self.patch_to(source, &output, entry_name, bytes)
    }

    /// Replace `entry_name` in `source`, writing to `output`.
    pub fn patch_to(
        &self,
        source: &Path,
        output: &Path,
        entry_name: &str,
        bytes: &[u8],
    ) -> Result<PatchedArchive> {
        let mut replaced = false;
        rewrite_archive(source, output, |archive, index| {
            let matches = archive
                .by_index_raw(index)
                .map_err(|e| Error::archive(source, e))?
                .name()
                == entry_name;
            if !matches {
                return Ok(None);
            }
            replaced = true;
            Ok(Some(bytes.to_vec()))
        })?;

        if replaced {
            tracing::info!("Patched {} into {}", entry_name, output.display());
        } else {
            tracing::warn!(
                "{} has no entry {}; wrote an unmodified copy to {}",
                source.display(),
                entry_name,
                output.display()
            );
        }

        Ok(PatchedArchive {
            path: output.to_path_buf(),
            replaced,
        })
    }
}

/// Stream `source` into `output`, entry by entry.
///
/// `edit` is called once per entry index. Returning new contents rewrites
/// that entry under the same name, compression method and mode; returning
/// `None` copies it raw. The copy is staged in a temporary file next to
/// `output` and renamed over it only after every entry was written.
pub(super) fn rewrite_archive<F>(source: &Path, output: &Path, mut edit: F) -> Result<()>
where
    F: FnMut(&mut ArchiveReader, usize) -> Result<Option<Vec<u8>>>,
{
    if same_file(source, output) {
        return Err(Error::archive(output, "output would overwrite the source archive"));
    }

    let mut archive = reader::open(source)?;
    let mut staged = tempfile::Builder::new()
        .prefix(".jarsmith-")
        .suffix(".tmp")
        .tempfile_in(paths::parent_dir(output))
        .map_err(|e| Error::archive(output, e))?;

    {
        let mut writer = ZipWriter::new(staged.as_file_mut());

        for index in 0..archive.len() {
            let replacement = edit(&mut archive, index)?;
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| Error::archive(source, e))?;

            let Some(bytes) = replacement else {
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| Error::archive(output, e))?;
                continue;
            };

            let method = match entry.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let mut options = SimpleFileOptions::default().compression_method(method);
            if let Some(mode) = entry.unix_mode() {
                options = options.unix_permissions(mode);
            }
            let name = entry.name().to_string();
            drop(entry);

            writer
                .start_file(name, options)
                .map_err(|e| Error::archive(output, e))?;
            writer
                .write_all(&bytes)
                .map_err(|e| Error::archive(output, e))?;
        }

        writer.finish().map_err(|e| Error::archive(output, e))?;
    }

    staged
        .as_file()
        .sync_all()
        .map_err(|e| Error::archive(output, e))?;
    staged
        .persist(output)
        .map_err(|e| Error::archive(output, e.error))?;
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn write_jar(path: &Path, entries: &[(&str, &[u8], CompressionMethod)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, bytes, method) in entries {
            let options = SimpleFileOptions::default().compression_method(*method);
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    fn read_all(path: &Path) -> Vec<(String, Vec<u8>, CompressionMethod)> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes).unwrap();
                (entry.name().to_string(), bytes, entry.compression())
            })
            .collect()
    }

    fn sample(temp: &TempDir) -> PathBuf {
        let jar = temp.path().join("MyPlugin.jar");
        write_jar(
            &jar,
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n", CompressionMethod::Deflated),
                ("A.class", b"old bytecode", CompressionMethod::Deflated),
                ("B.txt", b"keep me", CompressionMethod::Stored),
            ],
        );
        jar
    }

    #[test]
    fn test_patch_replaces_only_named_entry() {
        let temp = TempDir::new().unwrap();
        let jar = sample(&temp);
        let before = fs::read(&jar).unwrap();

        let patched = ArchivePatcher::new("_PATCHED")
            .patch(&jar, "A.class", b"\xCA\xFE\xBA\xBEnew")
            .expect("Failed to patch archive");

        assert!(patched.replaced);
        assert_eq!(patched.path, temp.path().join("MyPlugin_PATCHED.jar"));
        assert_eq!(fs::read(&jar).unwrap(), before);

        let entries = read_all(&patched.path);
        assert_eq!(
            entries,
            vec![
                (
                    "META-INF/MANIFEST.MF".to_string(),
                    b"Manifest-Version: 1.0\n".to_vec(),
                    CompressionMethod::Deflated
                ),
                (
                    "A.class".to_string(),
                    b"\xCA\xFE\xBA\xBEnew".to_vec(),
                    CompressionMethod::Deflated
                ),
                ("B.txt".to_string(), b"keep me".to_vec(), CompressionMethod::Stored),
            ]
        );
    }

    #[test]
    fn test_untouched_entries_keep_raw_bytes() {
        let temp = TempDir::new().unwrap();
        let jar = sample(&temp);

        let patched = ArchivePatcher::new("_PATCHED")
            .patch(&jar, "A.class", b"new")
            .unwrap();

        let raw = |path: &Path, name: &str| {
            let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
            let entry = archive.by_name(name).unwrap();
            (entry.compressed_size(), entry.crc32())
        };
        assert_eq!(raw(&jar, "META-INF/MANIFEST.MF"), raw(&patched.path, "META-INF/MANIFEST.MF"));
        assert_eq!(raw(&jar, "B.txt"), raw(&patched.path, "B.txt"));
    }

    #[test]
    fn test_missing_entry_writes_unmodified_copy() {
        let temp = TempDir::new().unwrap();
        let jar = sample(&temp);

        let patched = ArchivePatcher::new("_PATCHED")
            .patch(&jar, "missing/C.class", b"x")
            .unwrap();

        assert!(!patched.replaced);
        assert_eq!(read_all(&patched.path), read_all(&jar));
    }

    #[test]
    fn test_existing_output_is_overwritten() {
        let temp = TempDir::new().unwrap();
        let jar = sample(&temp);
        fs::write(temp.path().join("MyPlugin_PATCHED.jar"), "stale").unwrap();

        let patched = ArchivePatcher::new("_PATCHED")
            .patch(&jar, "A.class", b"fresh")
            .unwrap();

        assert_eq!(read_all(&patched.path)[1].1, b"fresh".to_vec());
    }

    fn temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_non_archive_source_leaves_previous_output() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("Broken.jar");
        fs::write(&jar, "not a zip").unwrap();
        let previous = temp.path().join("Broken_PATCHED.jar");
        fs::write(&previous, "previous output").unwrap();

        let result = ArchivePatcher::new("_PATCHED").patch(&jar, "A.class", b"x");

        assert!(matches!(result, Err(Error::Archive { .. })));
        assert_eq!(fs::read_to_string(&previous).unwrap(), "previous output");
        assert!(temp_files(temp.path()).is_empty());
    }

    #[test]
    fn test_corrupt_entry_mid_stream_removes_staged_output() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("Corrupt.jar");
        write_jar(
            &jar,
            &[
                ("A.class", b"old bytecode", CompressionMethod::Stored),
                ("B.txt", b"keep me", CompressionMethod::Stored),
            ],
        );

        // Break the second local header; the central directory still lists it.
        let mut bytes = fs::read(&jar).unwrap();
        let second_header = bytes
            .windows(4)
            .enumerate()
            .filter(|(_, window)| window.starts_with(b"PK\x03\x04"))
            .map(|(offset, _)| offset)
            .nth(1)
            .expect("Second local header not found");
        bytes[second_header..second_header + 4].fill(0);
        fs::write(&jar, &bytes).unwrap();

        let previous = temp.path().join("Corrupt_PATCHED.jar");
        fs::write(&previous, "previous output").unwrap();

        let result = ArchivePatcher::new("_PATCHED").patch(&jar, "A.class", b"x");

        assert!(matches!(result, Err(Error::Archive { .. })));
        assert_eq!(fs::read_to_string(&previous).unwrap(), "previous output");
        assert_eq!(fs::read(&jar).unwrap(), bytes);
        assert!(temp_files(temp.path()).is_empty());
    }

    #[test]
    fn test_refuses_to_overwrite_source() {
        let temp = TempDir::new().unwrap();
        let jar = sample(&temp);

        let result = ArchivePatcher::new("_PATCHED").patch_to(&jar, &jar, "A.class", b"x");
        assert!(result.is_err());
    }
}
