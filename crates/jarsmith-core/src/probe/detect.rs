//! Target version detection for plugin archives.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::descriptor::{DESCRIPTOR_ENTRIES, PluginDescriptor, normalize_version};
use crate::archive::reader::{self, ArchiveReader};
use crate::version::Version;

/// Versioned server package markers such as `v1_16_R3`.
static CLASS_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v?(1)_([0-9]{1,2})_R([0-9]+)").expect("class marker pattern is valid")
});

static CLASS_DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(1\.[0-9]{1,2}(?:\.[0-9]{1,2})?)\b").expect("dotted pattern is valid")
});

/// How the target version of a plugin was determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "from", rename_all = "kebab-case")]
pub enum DetectionSource {
    /// Read from a descriptor entry.
    Descriptor(String),
    /// Converted from a `v1_16_R3` style marker in a class name.
    ClassMarker(String),
    /// A dotted version token inside a class name.
    ClassName(String),
    /// Nothing matched; the configured default was used.
    Default,
}

/// Everything learned about a plugin archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    /// The descriptor entry that was read, if any.
    pub descriptor_entry: Option<String>,
    pub descriptor: PluginDescriptor,
    /// Platform version the plugin is compiled against.
    pub target_version: Version,
    pub detected_by: DetectionSource,
}

/// Extracts descriptor metadata and the target version from an archive.
#[derive(Debug, Clone)]
pub struct MetadataProbe {
    default_target: Version,
}

impl MetadataProbe {
    /// Create a probe that falls back to `default_target`.
    pub fn new(default_target: Version) -> Self {
        Self { default_target }
    }

    /// Inspect an archive.
    ///
    /// Never fails: an unreadable archive is logged and yields the default
    /// target version with an empty descriptor.
    pub fn probe(&self, archive_path: &Path) -> PluginInfo {
        tracing::info!("Detecting target version of {}", archive_path.display());

        let mut archive = match reader::open(archive_path) {
            Ok(archive) => archive,
            Err(e) => {
                tracing::warn!("Cannot inspect archive: {}", e);
                return self.default_info(None, PluginDescriptor::default());
            }
        };

        let (descriptor_entry, descriptor) = match read_descriptor(&mut archive) {
            Some((entry, descriptor)) => (Some(entry), descriptor),
            None => (None, PluginDescriptor::default()),
        };

        if let (Some(entry), Some(version)) =
            (&descriptor_entry, &descriptor.target_platform_version)
        {
            tracing::info!("Target version {} from {}", version, entry);
            return PluginInfo {
                target_version: version.clone(),
                detected_by: DetectionSource::Descriptor(entry.clone()),
                descriptor_entry,
                descriptor,
            };
        }

        let class_names = class_names(&mut archive);

        if let Some((version, class)) = detect_from_class_marker(&class_names) {
            tracing::info!("Target version {} from class marker in {}", version, class);
            return PluginInfo {
                descriptor_entry,
                descriptor,
                target_version: version,
                detected_by: DetectionSource::ClassMarker(class),
            };
        }

        if let Some((version, class)) = detect_from_dotted_class(&class_names) {
            tracing::info!("Target version {} from class name {}", version, class);
            return PluginInfo {
                descriptor_entry,
                descriptor,
                target_version: version,
                detected_by: DetectionSource::ClassName(class),
            };
        }

        tracing::warn!(
            "Could not detect target version, using default {}",
            self.default_target
        );
        self.default_info(descriptor_entry, descriptor)
    }

    fn default_info(
        &self,
        descriptor_entry: Option<String>,
        descriptor: PluginDescriptor,
    ) -> PluginInfo {
        PluginInfo {
            descriptor_entry,
            descriptor,
            target_version: self.default_target.clone(),
            detected_by: DetectionSource::Default,
        }
    }
}

/// Read the first descriptor present, in priority order.
fn read_descriptor(archive: &mut ArchiveReader) -> Option<(String, PluginDescriptor)> {
    for entry in DESCRIPTOR_ENTRIES {
        match reader::read_entry(archive, entry) {
            Ok(Some(bytes)) => {
                let text = String::from_utf8_lossy(&bytes);
                tracing::debug!("Reading descriptor {}", entry);
                return Some((entry.to_string(), PluginDescriptor::parse(&text)));
            }
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", entry, e);
                continue;
            }
        }
    }
    None
}

/// Dotted class names (`a/b/C.class` → `a.b.C`) in archive order.
fn class_names(archive: &mut ArchiveReader) -> Vec<String> {
    reader::entry_names(archive)
        .into_iter()
        .filter_map(|name| {
            name.strip_suffix(".class")
                .map(|class| class.replace('/', "."))
        })
        .collect()
}

fn detect_from_class_marker(class_names: &[String]) -> Option<(Version, String)> {
    class_names.iter().find_map(|class| {
        let caps = CLASS_MARKER.captures(class)?;
        let dotted = format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]);
        let version = dotted.parse().ok()?;
        Some((version, class.clone()))
    })
}

fn detect_from_dotted_class(class_names: &[String]) -> Option<(Version, String)> {
    class_names.iter().find_map(|class| {
        let token = CLASS_DOTTED.captures(class)?.get(1)?.as_str();
        let version = normalize_version(token)?;
        Some((version, class.clone()))
    })
}
