//! Read-only helpers over zip archives.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Error, Result};

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_SIZE_HINT: u64 = 1 << 20;

/// A zip archive opened for reading from disk.
pub type ArchiveReader = ZipArchive<BufReader<File>>;

/// Open an archive for reading.
pub fn open(path: &Path) -> Result<ArchiveReader> {
    let file = File::open(path).map_err(|e| Error::archive(path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| Error::archive(path, e))
}

/// Entry names in archive order.
pub fn entry_names(archive: &mut ArchiveReader) -> Vec<String> {
    (0..archive.len())
        .filter_map(|index| {
            archive
                .by_index_raw(index)
                .ok()
                .map(|entry| entry.name().to_string())
        })
        .collect()
}

/// Read the full contents of a named entry; `Ok(None)` if it is absent.
pub fn read_entry(archive: &mut ArchiveReader, name: &str) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Error::archive(name, e)),
    };
    let mut bytes = Vec::with_capacity(size_hint(entry.size()));
    entry.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Headers are untrusted, so the declared size only seeds the buffer.
fn size_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_SIZE_HINT)).unwrap_or(0)
}
