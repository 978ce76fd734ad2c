//! Core engine for jarsmith, a plugin JAR patcher.
//!
//! This crate provides:
//! - Version parsing and best-match ranking of dependency artifacts
//! - Plugin descriptor probing for the target platform version
//! - Dependency discovery with a process-wide cache
//! - Classpath assembly and single-unit compilation through `javac`
//! - Atomic single-entry archive patching and string constant replacement
//! - A worker pool for concurrent patch jobs

pub mod archive;
pub mod classpath;
pub mod compile;
pub mod config;
pub mod error;
pub mod locate;
pub mod paths;
pub mod pipeline;
pub mod probe;
pub mod version;

pub use archive::{ArchivePatcher, PatchedArchive, StringPatch, StringReplacer};
pub use classpath::{Classpath, ClasspathAssembler, ClasspathEntry, ClasspathSources, Origin};
pub use compile::{
    CompileOutcome, CompileRequest, CompiledUnit, CompilerGateway, Diagnostic, Severity,
    ToolchainManager, ToolchainReport,
};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use locate::{DependencyCache, DependencyLocator, LocatedDependencies};
pub use pipeline::{JobHandle, PatchJob, PatchReport, PatchService, Pipeline, Resolution};
pub use probe::{DetectionSource, MetadataProbe, PluginDescriptor, PluginInfo};
pub use version::{Candidate, ParseVersionError, Version, best_match, newest};
