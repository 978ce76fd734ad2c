//! Replace-string command implementation.

use std::path::Path;

use jarsmith_core::{Pipeline, PipelineConfig};

use crate::colors;

/// Rewrite string constants in every class of an archive.
pub fn execute(
    config: PipelineConfig,
    archive: &Path,
    from: &str,
    to: &str,
    json: bool,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config)?;
    let patch = pipeline.replace_strings(archive, from, to)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&patch)?);
        return Ok(());
    }

    if patch.classes_changed == 0 {
        println!(
            "{}No string constant contains {:?}; wrote an unmodified copy{}",
            colors::YELLOW,
            from,
            colors::RESET
        );
    } else {
        println!(
            "{}Replaced{} {} constants in {} classes",
            colors::GREEN,
            colors::RESET,
            patch.constants_replaced,
            patch.classes_changed
        );
    }
    for name in &patch.skipped {
        println!("  {}skipped unreadable class {}{}", colors::DIM, name, colors::RESET);
    }
    println!("  output  {}", patch.path.display());
    Ok(())
}
