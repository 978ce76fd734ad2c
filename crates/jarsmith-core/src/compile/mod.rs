//! Compilation of a single Java source unit.
//!
//! ```text
//! CompileRequest ──► ToolchainManager::locate ──► scratch/<Unit>.java
//!                                                   │ javac -g -parameters ...
//!                                                   ▼
//!                               scratch/classes/**/<Unit>.class ──► CompileOutcome
//! ```

mod diagnostics;
mod gateway;
mod toolchain;
mod types;

pub use diagnostics::{Diagnostic, Severity, parse_javac_output};
pub use gateway::CompilerGateway;
pub use toolchain::{TOOLCHAIN_GUIDANCE, ToolchainManager, ToolchainReport};
pub use types::{CompileOutcome, CompileRequest, CompiledUnit};
