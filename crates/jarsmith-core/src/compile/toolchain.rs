//! Java toolchain discovery.
//!
//! Finds `javac` from an explicit path, `$JAVA_HOME/bin`, or `PATH`, in
//! that order.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::error::{Error, Result};

/// Remediation shown when no compiler can be found.
pub const TOOLCHAIN_GUIDANCE: &str = "install a JDK (a JRE does not include javac), for example from https://adoptium.net/, and set JAVA_HOME to its installation directory";

/// Summary of the discovered toolchain, for `jarsmith doctor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainReport {
    pub javac: PathBuf,
    pub java_home: Option<PathBuf>,
    pub version: String,
}

/// A located Java compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainManager {
    /// Path to javac
    javac_path: PathBuf,

    /// JDK installation directory, if it could be determined
    java_home: Option<PathBuf>,
}

impl ToolchainManager {
    /// Locate `javac` using the process environment.
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        Self::locate_with_env(configured, std::env::var_os("JAVA_HOME"))
    }

    /// Locate `javac` with an explicit `JAVA_HOME` value.
    pub fn locate_with_env(configured: Option<&Path>, java_home: Option<OsString>) -> Result<Self> {
        let mut checked = Vec::new();

        if let Some(path) = configured {
            if path.is_file() {
                return Ok(Self::from_javac(path.to_path_buf(), None));
            }
            tracing::warn!("Configured javac {} does not exist", path.display());
            checked.push(path.display().to_string());
        }

        if let Some(home) = java_home.map(PathBuf::from).filter(|h| !h.as_os_str().is_empty()) {
            let candidate = home.join("bin").join(javac_file_name());
            if candidate.is_file() {
                return Ok(Self::from_javac(candidate, Some(home)));
            }
            tracing::debug!("No javac under JAVA_HOME {}", home.display());
            checked.push(candidate.display().to_string());
        }

        match which::which("javac") {
            Ok(path) => Ok(Self::from_javac(path, None)),
            Err(_) => {
                checked.push("PATH".to_string());
                Err(Error::ToolchainUnavailable {
                    guidance: format!("{} (checked: {})", TOOLCHAIN_GUIDANCE, checked.join(", ")),
                })
            }
        }
    }

    fn from_javac(javac_path: PathBuf, java_home: Option<PathBuf>) -> Self {
        let java_home = java_home.or_else(|| infer_java_home(&javac_path));
        tracing::debug!("Using javac at {}", javac_path.display());
        Self {
            javac_path,
            java_home,
        }
    }

    /// Get the javac path.
    pub fn javac_path(&self) -> &Path {
        &self.javac_path
    }

    /// JDK installation directory, used for standard-library JARs.
    pub fn java_home(&self) -> Option<&Path> {
        self.java_home.as_deref()
    }

    /// Run `javac -version`.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.javac_path).arg("-version").output()?;

        // Java 8 prints the version on stderr, later releases on stdout.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stdout.trim().is_empty() { stderr } else { stdout };

        if !output.status.success() {
            return Err(Error::ToolchainUnavailable {
                guidance: format!(
                    "{} failed to report its version: {}",
                    self.javac_path.display(),
                    text.trim()
                ),
            });
        }
        Ok(text.trim().to_string())
    }

    /// Path, home and version of the toolchain.
    pub fn describe(&self) -> Result<ToolchainReport> {
        Ok(ToolchainReport {
            javac: self.javac_path.clone(),
            java_home: self.java_home.clone(),
            version: self.version()?,
        })
    }
}

fn javac_file_name() -> String {
    format!("javac{}", std::env::consts::EXE_SUFFIX)
}

/// `<home>/bin/javac` → `<home>`, following symlinks such as
/// `/usr/bin/javac`.
fn infer_java_home(javac: &Path) -> Option<PathBuf> {
    let resolved = std::fs::canonicalize(javac).unwrap_or_else(|_| javac.to_path_buf());
    let bin = resolved.parent()?;
    if bin.file_name()? != "bin" {
        return None;
    }
    bin.parent().map(Path::to_path_buf)
}
