//! The end-to-end patch pipeline for a single archive.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::archive::{ArchivePatcher, StringPatch, StringReplacer};
use crate::classpath::{Classpath, ClasspathAssembler, ClasspathSources};
use crate::compile::{CompileRequest, CompilerGateway, Diagnostic};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::locate::{DependencyCache, DependencyLocator};
use crate::probe::{MetadataProbe, PluginInfo};
use crate::version::Version;

/// One recompile-and-patch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchJob {
    /// Archive containing the class
    pub archive: PathBuf,

    /// Fully qualified class name, e.g. `com.example.Main`
    pub class_name: String,

    /// Full text of the modified `.java` source
    pub source_text: String,

    /// Extra classpath entries for this job only
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
}

impl PatchJob {
    pub fn new(
        archive: impl Into<PathBuf>,
        class_name: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            archive: archive.into(),
            class_name: class_name.into(),
            source_text: source_text.into(),
            classpath: Vec::new(),
        }
    }

    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }
}

/// Outcome of a successful patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub archive: PathBuf,
    pub output: PathBuf,
    /// Archive entry that received the new bytecode
    pub entry_name: String,
    /// False when the archive had no such entry and was copied unchanged
    pub replaced: bool,
    pub target_version: Version,
    pub dependency: Option<PathBuf>,
    /// Warnings and notes from the compiler
    pub warnings: Vec<Diagnostic>,
}

/// Everything decided before compilation: target, dependency and classpath.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub info: PluginInfo,
    pub candidates: Vec<PathBuf>,
    pub dependency: Option<PathBuf>,
    pub classpath: Classpath,
}

/// Probe, locate, assemble, compile and patch.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    probe: MetadataProbe,
    locator: DependencyLocator,
    assembler: ClasspathAssembler,
    gateway: CompilerGateway,
    patcher: ArchivePatcher,
    replacer: StringReplacer,
}

impl Pipeline {
    /// Create a pipeline with its own dependency cache.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_cache(config, Arc::new(DependencyCache::new()))
    }

    /// Create a pipeline sharing `cache` with other pipelines.
    pub fn with_cache(config: PipelineConfig, cache: Arc<DependencyCache>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            probe: MetadataProbe::new(config.default_target.clone()),
            locator: DependencyLocator::new(config.clone(), cache),
            assembler: ClasspathAssembler::new(&config),
            gateway: CompilerGateway::new(&config),
            patcher: ArchivePatcher::new(config.output_marker.clone()),
            replacer: StringReplacer::default(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read the archive's descriptor and detect its target version.
    pub fn inspect(&self, archive: &Path) -> Result<PluginInfo> {
        ensure_archive(archive)?;
        Ok(self.probe.probe(archive))
    }

    /// Work out the target version, dependency and classpath for `archive`
    /// without compiling anything.
    pub fn resolve(&self, archive: &Path, extra_classpath: &[PathBuf]) -> Result<Resolution> {
        ensure_archive(archive)?;
        let java_home = match self.gateway.toolchain() {
            Ok(toolchain) => toolchain.java_home().map(Path::to_path_buf),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };
        Ok(self.resolve_with(archive, extra_classpath, java_home.as_deref()))
    }

    fn resolve_with(
        &self,
        archive: &Path,
        extra_classpath: &[PathBuf],
        java_home: Option<&Path>,
    ) -> Resolution {
        let info = self.probe.probe(archive);
        let located = self.locator.locate(archive);
        let dependency = located.select(&info.target_version);
        if dependency.is_none() {
            tracing::warn!(
                "No dependency artifact found for target {}; compiling without one",
                info.target_version
            );
        }

        let classpath = self.assembler.assemble(ClasspathSources {
            archive,
            java_home,
            caller_supplied: extra_classpath,
            dependency: dependency.as_deref(),
            siblings: &located.siblings,
        });

        Resolution {
            info,
            candidates: located.candidate_paths(),
            dependency,
            classpath,
        }
    }

    /// Recompile `class_name` from `source_text` and write the patched
    /// archive, returning its path.
    pub fn patch_archive(
        &self,
        archive: &Path,
        class_name: &str,
        source_text: &str,
    ) -> Result<PathBuf> {
        let job = PatchJob::new(archive, class_name, source_text);
        Ok(self.patch(&job)?.output)
    }

    /// Run one job through every stage.
    pub fn patch(&self, job: &PatchJob) -> Result<PatchReport> {
        let class = ClassName::parse(&job.class_name)?;
        ensure_archive(&job.archive)?;
        let toolchain = self.gateway.toolchain()?;

        tracing::info!("Patching {} in {}", class.qualified, job.archive.display());

        let resolution = self.resolve_with(&job.archive, &job.classpath, toolchain.java_home());
        let target_version = resolution.info.target_version.clone();

        let request = CompileRequest {
            source_text: job.source_text.clone(),
            unit_name: class.simple.clone(),
            classpath: resolution.classpath,
            target_version: target_version.clone(),
        };
        let compiled = self
            .gateway
            .compile_with(&toolchain, &request)
            .into_result(&class.qualified)?;

        let patched = self
            .patcher
            .patch(&job.archive, &class.entry_name, &compiled.bytecode)?;

        Ok(PatchReport {
            archive: job.archive.clone(),
            output: patched.path,
            entry_name: class.entry_name,
            replaced: patched.replaced,
            target_version,
            dependency: resolution.dependency,
            warnings: compiled.diagnostics,
        })
    }

    /// Replace `from` with `to` in the string constants of every class,
    /// writing `<stem>_STRING_PATCHED<ext>` beside the archive.
    ///
    /// Needs no compiler and no dependencies.
    pub fn replace_strings(&self, archive: &Path, from: &str, to: &str) -> Result<StringPatch> {
        ensure_archive(archive)?;
        tracing::info!("Replacing {:?} with {:?} in {}", from, to, archive.display());
        self.replacer.replace(archive, from, to)
    }
}

fn ensure_archive(archive: &Path) -> Result<()> {
    if archive.is_file() {
        Ok(())
    } else {
        Err(Error::archive(archive, "no such archive"))
    }
}

/// A class name in its three spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClassName {
    /// `com.example.Main`
    qualified: String,
    /// `Main`
    simple: String,
    /// `com/example/Main.class`
    entry_name: String,
}

impl ClassName {
    /// Accepts dotted names, entry paths and either with a `.class` suffix.
    fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let without_suffix = trimmed.strip_suffix(".class").unwrap_or(trimmed);
        let qualified = without_suffix.replace('/', ".");
        let simple = qualified.rsplit('.').next().unwrap_or_default().to_string();

        let is_identifier = |part: &str| {
            !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        };
        if !qualified.split('.').all(is_identifier) {
            return Err(Error::Config(format!("invalid class name '{raw}'")));
        }

        Ok(Self {
            entry_name: format!("{}.class", qualified.replace('.', "/")),
            simple,
            qualified,
        })
    }
}
