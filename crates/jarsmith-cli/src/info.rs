//! Info command implementation.

use std::path::Path;

use jarsmith_core::{DetectionSource, Pipeline, PipelineConfig};

use crate::colors;

/// Print descriptor metadata and the detected target version.
pub fn execute(config: PipelineConfig, archive: &Path, json: bool) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config)?;
    let info = pipeline.inspect(archive)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}{}{}", colors::BOLD, archive.display(), colors::RESET);

    let descriptor = &info.descriptor;
    let fields = [
        ("name", descriptor.name.as_deref()),
        ("version", descriptor.declared_version.as_deref()),
        ("main", descriptor.main_class.as_deref()),
        ("author", descriptor.author.as_deref()),
        ("description", descriptor.description.as_deref()),
        ("website", descriptor.website.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {:<12}{}", label, value);
        }
    }
    if !descriptor.authors.is_empty() {
        println!("  {:<12}{}", "authors", descriptor.authors.join(", "));
    }

    let source = match &info.detected_by {
        DetectionSource::Descriptor(entry) => format!("from {entry}"),
        DetectionSource::ClassMarker(class) => format!("from class marker in {class}"),
        DetectionSource::ClassName(class) => format!("from class name {class}"),
        DetectionSource::Default => "default".to_string(),
    };
    println!(
        "  {:<12}{}{}{} {}({}){}",
        "target",
        colors::CYAN,
        info.target_version,
        colors::RESET,
        colors::DIM,
        source,
        colors::RESET
    );
    Ok(())
}
