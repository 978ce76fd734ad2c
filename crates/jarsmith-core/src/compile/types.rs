//! Common types for the compilation stage.

use crate::classpath::Classpath;
use crate::error::{Error, Result};
use crate::version::Version;

use super::Diagnostic;

/// One source unit to compile.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Full text of the `.java` file
    pub source_text: String,

    /// Simple class name; the file is written as `<unit_name>.java`
    pub unit_name: String,

    pub classpath: Classpath,

    /// Platform version the archive targets; older targets compile as Java 8
    pub target_version: Version,
}

/// Bytecode of a successfully compiled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    pub bytecode: Vec<u8>,
    /// Warnings and notes reported alongside the successful compile
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of a compilation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Success(CompiledUnit),
    /// Compilation failed; error diagnostics in reported order
    Failed { diagnostics: Vec<Diagnostic> },
    /// No compiler could be found
    ToolchainUnavailable { guidance: String },
}

impl CompileOutcome {
    /// Failure with a single message that has no source line.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            diagnostics: vec![Diagnostic::new(None, super::Severity::Error, message)],
        }
    }

    /// Convert to a `Result`, naming `unit` in compilation errors.
    pub fn into_result(self, unit: &str) -> Result<CompiledUnit> {
        match self {
            Self::Success(compiled) => Ok(compiled),
            Self::Failed { diagnostics } => Err(Error::Compilation {
                unit: unit.to_string(),
                diagnostics,
            }),
            Self::ToolchainUnavailable { guidance } => Err(Error::ToolchainUnavailable { guidance }),
        }
    }
}
