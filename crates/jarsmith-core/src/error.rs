//! Error types for jarsmith-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::compile::Diagnostic;

/// Result type for jarsmith-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in jarsmith-core.
#[derive(Debug, Error)]
pub enum Error {
    /// No Java compiler could be found in the running environment.
    #[error("Java compiler not found: {guidance}")]
    ToolchainUnavailable { guidance: String },

    /// The modified source unit failed to compile.
    #[error("compilation failed for {unit}: {}", summarize(diagnostics))]
    Compilation {
        unit: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// Reading or writing an archive failed while patching.
    #[error("archive error for {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A worker in the patch pool went away before reporting a result.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an archive error from any displayable cause.
    pub fn archive(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::Archive {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Render the error together with a recovery hint, for terminal output.
    pub fn with_hint(&self) -> String {
        match self {
            Self::ToolchainUnavailable { .. } => format!(
                "{self}\n  hint: run `jarsmith doctor` to see which compiler locations were checked"
            ),
            Self::Compilation { diagnostics, .. } => {
                let mut out = format!("{self}\n");
                for diagnostic in diagnostics {
                    out.push_str(&format!("  {diagnostic}\n"));
                }
                out.push_str("  hint: fix the reported lines and run the patch again");
                out
            }
            Self::Archive { .. } => format!(
                "{self}\n  hint: the original archive was left untouched; check that it is a valid JAR and the directory is writable"
            ),
            Self::Config(_) => {
                format!("{self}\n  hint: check the JSON passed with --config")
            }
            Self::WorkerPool(_) | Self::Io(_) => self.to_string(),
        }
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "no diagnostics reported".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
