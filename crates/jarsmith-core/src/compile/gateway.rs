//! Single-unit compilation through an external `javac`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::diagnostics::{Diagnostic, Severity, parse_javac_output};
use super::toolchain::ToolchainManager;
use super::types::{CompileOutcome, CompileRequest, CompiledUnit};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::paths;
use crate::version::Version;

/// Compiles one source unit per call.
///
/// Each call works in its own scratch directory, removed when the call
/// returns.
#[derive(Debug, Clone)]
pub struct CompilerGateway {
    javac: Option<PathBuf>,
    legacy_threshold: Version,
}

impl CompilerGateway {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            javac: config.javac.clone(),
            legacy_threshold: config.legacy_threshold.clone(),
        }
    }

    /// Locate the compiler this gateway uses.
    pub fn toolchain(&self) -> Result<ToolchainManager> {
        ToolchainManager::locate(self.javac.as_deref())
    }

    /// Locate the toolchain and compile `request`.
    pub fn compile(&self, request: &CompileRequest) -> CompileOutcome {
        match self.toolchain() {
            Ok(toolchain) => self.compile_with(&toolchain, request),
            Err(Error::ToolchainUnavailable { guidance }) => {
                CompileOutcome::ToolchainUnavailable { guidance }
            }
            Err(e) => CompileOutcome::failed(e.to_string()),
        }
    }

    /// Compile `request` with an already located toolchain.
    pub fn compile_with(
        &self,
        toolchain: &ToolchainManager,
        request: &CompileRequest,
    ) -> CompileOutcome {
        let unit = request.unit_name.as_str();
        if !is_simple_name(unit) {
            return CompileOutcome::failed(format!("invalid unit name '{unit}'"));
        }

        let scratch = match paths::scratch_dir("jarsmith-compile-") {
            Ok(dir) => dir,
            Err(e) => return CompileOutcome::failed(format!("cannot create scratch directory: {e}")),
        };
        let source_path = scratch.path().join(format!("{unit}.java"));
        let classes_dir = scratch.path().join("classes");

        if let Err(e) = fs::write(&source_path, &request.source_text)
            .and_then(|()| fs::create_dir(&classes_dir))
        {
            return CompileOutcome::failed(format!("cannot prepare sources: {e}"));
        }

        let classpath = match request.classpath.to_path_list() {
            Ok(list) => list,
            Err(e) => return CompileOutcome::failed(e.to_string()),
        };
        let args = self.javac_args(&request.target_version, &classpath, &classes_dir, &source_path);

        tracing::info!(
            "Compiling {} against {} classpath entries",
            unit,
            request.classpath.len()
        );
        tracing::debug!("{} {:?}", toolchain.javac_path().display(), args);

        let output = match Command::new(toolchain.javac_path()).args(&args).output() {
            Ok(output) => output,
            Err(e) => {
                return CompileOutcome::failed(format!(
                    "failed to run {}: {e}",
                    toolchain.javac_path().display()
                ));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut diagnostics = parse_javac_output(&stderr);
        diagnostics.extend(parse_javac_output(&stdout));

        if !output.status.success() {
            let mut errors: Vec<_> = diagnostics.into_iter().filter(|d| d.is_error()).collect();
            if errors.is_empty() {
                let raw = stderr.trim();
                let message = if raw.is_empty() {
                    format!("javac exited with {}", output.status)
                } else {
                    raw.to_string()
                };
                errors.push(Diagnostic::new(None, Severity::Error, message));
            }
            tracing::warn!("Compilation of {} failed with {} errors", unit, errors.len());
            return CompileOutcome::Failed {
                diagnostics: errors,
            };
        }

        for diagnostic in &diagnostics {
            tracing::debug!("javac: {}", diagnostic);
        }

        let class_file = format!("{unit}.class");
        let Some(compiled) = find_class_file(&classes_dir, &class_file) else {
            return CompileOutcome::failed(format!(
                "javac reported success but produced no {class_file}"
            ));
        };

        match fs::read(&compiled) {
            Ok(bytecode) => {
                tracing::info!("Compiled {} ({} bytes)", class_file, bytecode.len());
                CompileOutcome::Success(CompiledUnit {
                    bytecode,
                    diagnostics,
                })
            }
            Err(e) => CompileOutcome::failed(format!("cannot read {}: {e}", compiled.display())),
        }
    }

    /// Whether `target` compiles with Java 8 source and target levels.
    pub fn is_legacy_target(&self, target: &Version) -> bool {
        *target < self.legacy_threshold
    }

    fn javac_args(
        &self,
        target: &Version,
        classpath: &OsString,
        out_dir: &Path,
        source: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-g", "-parameters", "-encoding", "UTF-8"]
            .into_iter()
            .map(OsString::from)
            .collect();

        if self.is_legacy_target(target) {
            args.extend(["-source", "8", "-target", "8"].map(OsString::from));
        }
        if !classpath.is_empty() {
            args.push("-cp".into());
            args.push(classpath.clone());
        }
        args.push("-d".into());
        args.push(out_dir.into());
        args.push(source.into());
        args
    }
}

fn is_simple_name(unit: &str) -> bool {
    !unit.is_empty() && unit.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Search `dir` recursively for a file named exactly `file_name`.
///
/// Nested and anonymous classes (`Main$1.class`) never match.
fn find_class_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for path in &entries {
        if path.is_file() && path.file_name().is_some_and(|name| name == file_name) {
            return Some(path.clone());
        }
    }
    entries
        .iter()
        .filter(|path| path.is_dir())
        .find_map(|sub| find_class_file(sub, file_name))
}
