//! Patch command implementation.
//!
//! Recompiles one class and writes the patched archive beside the original.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use jarsmith_core::{PatchJob, PatchReport, Pipeline, PipelineConfig};

use crate::colors;

/// Patch a single class.
pub fn execute(
    config: PipelineConfig,
    archive: &Path,
    class_name: &str,
    source: &Path,
    classpath: Vec<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let source_text = read_source(source)?;

    let pipeline = Pipeline::new(config)?;
    let job = PatchJob::new(archive, class_name, source_text).with_classpath(classpath);
    let report = pipeline.patch(&job)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        println!(
            "{}Done{} in {:.2}s",
            colors::GREEN,
            colors::RESET,
            start.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

/// Read the source file, or stdin for `-`.
pub fn read_source(source: &Path) -> anyhow::Result<String> {
    if source == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read source from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))
}

/// Print a human-readable summary of one patch.
pub fn print_report(report: &PatchReport) {
    if report.replaced {
        println!(
            "{}Patched{} {}",
            colors::GREEN,
            colors::RESET,
            report.entry_name
        );
    } else {
        println!(
            "{}No entry {} in {}; wrote an unmodified copy{}",
            colors::YELLOW,
            report.entry_name,
            report.archive.display(),
            colors::RESET
        );
    }

    let dependency = report
        .dependency
        .as_ref()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "no dependency".to_string());
    println!("  target  {} ({})", report.target_version, dependency);
    println!("  output  {}", report.output.display());

    for warning in &report.warnings {
        println!("  {}{}{}", colors::DIM, warning, colors::RESET);
    }
}
