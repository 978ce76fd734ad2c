//! Resolve command implementation.
//!
//! Shows the target version, chosen dependency and classpath for an archive
//! without compiling anything.

use std::path::{Path, PathBuf};

use jarsmith_core::{Pipeline, PipelineConfig};

use crate::colors;

pub fn execute(
    config: PipelineConfig,
    archive: &Path,
    classpath: &[PathBuf],
    json: bool,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config)?;
    let resolution = pipeline.resolve(archive, classpath)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    println!(
        "{}Target{} {}",
        colors::BOLD,
        colors::RESET,
        resolution.info.target_version
    );

    match &resolution.dependency {
        Some(path) => println!(
            "{}Dependency{} {}{}{}",
            colors::BOLD,
            colors::RESET,
            colors::GREEN,
            path.display(),
            colors::RESET
        ),
        None => println!(
            "{}Dependency{} {}none found{}",
            colors::BOLD,
            colors::RESET,
            colors::YELLOW,
            colors::RESET
        ),
    }

    if resolution.candidates.len() > 1 {
        println!("{}Candidates{}", colors::BOLD, colors::RESET);
        for candidate in &resolution.candidates {
            println!("  {}", candidate.display());
        }
    }

    println!("{}Classpath{}", colors::BOLD, colors::RESET);
    for entry in resolution.classpath.entries() {
        println!(
            "  {}{:<20}{} {}",
            colors::DIM,
            format!("{:?}", entry.origin),
            colors::RESET,
            entry.path.display()
        );
    }
    Ok(())
}
