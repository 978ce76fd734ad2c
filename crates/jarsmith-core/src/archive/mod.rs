//! Zip archive access: read-only helpers, the atomic class patcher and
//! string constant replacement.

pub mod class_file;
mod patcher;
pub mod reader;
mod strings;

pub use patcher::{ArchivePatcher, PatchedArchive};
pub use strings::{StringPatch, StringReplacer};
