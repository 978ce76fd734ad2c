//! Compiler diagnostics and the javac output parser.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// `Main.java:3: error: cannot find symbol`
static LOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?):([0-9]+): (error|warning|note|Note): (.*)$")
        .expect("located diagnostic pattern is valid")
});

/// `error: invalid flag: -foo`, `Note: Main.java uses unchecked operations.`
static UNLOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(error|warning|Note): (.*)$").expect("unlocated diagnostic pattern is valid")
});

/// `  symbol:   class Foo`
static DETAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(symbol|location|required|found|reason):\s*(.*)$")
        .expect("detail pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn from_javac(label: &str) -> Self {
        match label {
            "error" => Self::Error,
            "warning" => Self::Warning,
            _ => Self::Note,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Note => write!(f, "note"),
        }
    }
}

/// One message reported by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based line in the compiled source, if the message has one.
    pub line: Option<u32>,
    pub severity: Severity,
    pub message: String,
    /// Indented follow-up lines such as `symbol: class Foo`.
    pub details: Vec<String>,
}

impl Diagnostic {
    pub fn new(line: Option<u32>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            line,
            severity,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} at line {}: {}", self.severity, line, self.message)?,
            None => write!(f, "{}: {}", self.severity, self.message)?,
        }
        if !self.details.is_empty() {
            write!(f, " [{}]", self.details.join("; "))?;
        }
        Ok(())
    }
}

/// Parse javac's textual output into diagnostics, in the order reported.
///
/// Source echo lines, caret markers and the trailing `N errors` summary are
/// skipped.
pub fn parse_javac_output(output: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for line in output.lines() {
        if let Some(caps) = LOCATED.captures(line) {
            let line_number = caps[2].parse().ok();
            diagnostics.push(Diagnostic::new(
                line_number,
                Severity::from_javac(&caps[3]),
                caps[4].trim(),
            ));
        } else if let Some(caps) = UNLOCATED.captures(line) {
            diagnostics.push(Diagnostic::new(
                None,
                Severity::from_javac(&caps[1]),
                caps[2].trim(),
            ));
        } else if let Some(caps) = DETAIL.captures(line) {
            if let Some(last) = diagnostics.last_mut() {
                last.details
                    .push(format!("{}: {}", &caps[1], caps[2].trim()));
            }
        }
    }

    diagnostics
}
