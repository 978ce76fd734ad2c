//! Extract a version from free text such as an artifact file name.

use std::sync::LazyLock;

use regex::Regex;

use super::types::Version;

/// Patterns tried in order, most specific first. Group 1 is the version.
static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // spigot-api-1.21.1-R0.1-SNAPSHOT.jar
        r"(?i)([0-9]+\.[0-9]+(?:\.[0-9]+)?)-R[0-9]+\.[0-9]+-SNAPSHOT",
        // spigot-api-1.21-R0.1-20240715.123456-12.jar
        r"(?i)([0-9]+\.[0-9]+(?:\.[0-9]+)?)-R[0-9]+\.[0-9]+-[0-9]{8}\.[0-9]{6}-[0-9]+",
        // paper-api-1.16.5.jar
        r"(?i)[a-z-]+-([0-9]+\.[0-9]+(?:\.[0-9]+)?)[^0-9]",
        // 1.20.1.jar
        r"(?i)([0-9]+\.[0-9]+(?:\.[0-9]+)?)\.jar",
        r"([0-9]+\.[0-9]+(?:\.[0-9]+)?)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("version pattern is valid"))
    .collect()
});

/// Parse the first version-shaped token out of `text`.
///
/// Returns `None` when nothing matches; callers treat that as an unknown
/// version rather than an error.
pub fn parse(text: &str) -> Option<Version> {
    if text.is_empty() {
        return None;
    }

    PATTERNS.iter().find_map(|pattern| {
        let token = pattern.captures(text)?.get(1)?.as_str();
        token.parse::<Version>().ok()
    })
}
