//! Line-oriented `key: value` plugin descriptors.
//!
//! Descriptors are YAML in practice, but only a handful of top-level keys
//! are needed, so values are pulled out by key pattern instead of parsing
//! the whole document.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::version::Version;

/// Descriptor entries, in the order they are looked up.
pub const DESCRIPTOR_ENTRIES: &[&str] = &["plugin.yml", "paper-plugin.yml", "bungee.yml"];

/// Keys that may carry the target platform version, most specific first.
const TARGET_VERSION_KEYS: &[&str] = &[
    "api-version",
    "mc-version",
    "minecraft",
    "server-version",
    "version",
];

const VERSION_TOKEN: &str = r#"["']?v?(1\.[0-9]{1,2}(?:\.[0-9]{1,2})?)\b["']?"#;

static TARGET_VERSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mut patterns: Vec<Regex> = TARGET_VERSION_KEYS
        .iter()
        .map(|key| {
            Regex::new(&format!(r"(?im)^[ \t]*{}:[ \t]*{VERSION_TOKEN}", regex::escape(key)))
                .expect("descriptor key pattern is valid")
        })
        .collect();
    patterns.push(
        Regex::new(r"\b(1\.[0-9]{1,2}(?:\.[0-9]{1,2})?)\b").expect("bare version pattern is valid"),
    );
    patterns
});

/// Top-level informational keys read by [`PluginDescriptor::parse`].
const INFO_KEYS: &[&str] = &[
    "name",
    "version",
    "main",
    "author",
    "authors",
    "description",
    "website",
];

static INFO_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    INFO_KEYS
        .iter()
        .map(|key| {
            let pattern = Regex::new(&format!(
                r#"(?m)^{}:[ \t]*["']?(.*?)["']?[ \t]*\r?$"#,
                regex::escape(key)
            ))
            .expect("descriptor info pattern is valid");
            (*key, pattern)
        })
        .collect()
});

static VERSION_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1\.[0-9]{1,2}(?:\.[0-9]{1,2})?$").expect("shape is valid"));

/// Metadata declared by a plugin descriptor. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub name: Option<String>,
    pub declared_version: Option<String>,
    pub target_platform_version: Option<Version>,
    pub main_class: Option<String>,
    pub author: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub website: Option<String>,
}

impl PluginDescriptor {
    /// Read the fields of a descriptor's text.
    pub fn parse(text: &str) -> Self {
        Self {
            name: top_level_value(text, "name"),
            declared_version: top_level_value(text, "version"),
            target_platform_version: target_version(text),
            main_class: top_level_value(text, "main"),
            author: top_level_value(text, "author"),
            authors: top_level_value(text, "authors")
                .map(|value| split_list(&value))
                .unwrap_or_default(),
            description: top_level_value(text, "description"),
            website: top_level_value(text, "website"),
        }
    }
}

/// Find the target platform version in a descriptor.
///
/// Tries each synonym key in order, then any bare version-shaped token.
pub fn target_version(text: &str) -> Option<Version> {
    TARGET_VERSION_PATTERNS.iter().find_map(|pattern| {
        let token = pattern.captures(text)?.get(1)?.as_str();
        normalize_version(token)
    })
}

/// Strip quotes and `v` prefixes, and accept only `1.x` / `1.x.y` shapes.
pub fn normalize_version(raw: &str) -> Option<Version> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | 'v' | 'V'))
        .collect();
    if !VERSION_SHAPE.is_match(&cleaned) {
        return None;
    }
    cleaned.parse().ok()
}

fn top_level_value(text: &str, key: &str) -> Option<String> {
    let (_, pattern) = INFO_PATTERNS.iter().find(|(known, _)| *known == key)?;
    let value = pattern.captures(text)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
