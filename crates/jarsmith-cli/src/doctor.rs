//! Doctor command implementation.

use jarsmith_core::{CompilerGateway, PipelineConfig};

use crate::colors;

/// Report the Java toolchain the pipeline would use.
pub fn execute(config: &PipelineConfig) -> anyhow::Result<()> {
    let toolchain = CompilerGateway::new(config).toolchain()?;
    let report = toolchain.describe()?;

    println!("{}javac{}      {}", colors::BOLD, colors::RESET, report.javac.display());
    println!("{}version{}    {}", colors::BOLD, colors::RESET, report.version);
    match &report.java_home {
        Some(home) => println!("{}java home{}  {}", colors::BOLD, colors::RESET, home.display()),
        None => println!(
            "{}java home{}  {}unknown; standard-library JARs will not be added{}",
            colors::BOLD,
            colors::RESET,
            colors::YELLOW,
            colors::RESET
        ),
    }
    println!("{}Toolchain OK{}", colors::GREEN, colors::RESET);
    Ok(())
}
