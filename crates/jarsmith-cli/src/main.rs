//! jarsmith CLI - recompile one class inside a plugin JAR and patch it in.

mod batch;
mod colors;
mod doctor;
mod info;
mod patch;
mod replace_string;
mod resolve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jarsmith_core::PipelineConfig;

#[derive(Parser)]
#[command(name = "jarsmith")]
#[command(about = "Recompile a single class inside a plugin JAR and patch it in place")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompile one class and write <name>_PATCHED.jar beside the archive
    Patch {
        /// Path to the plugin archive (.jar)
        archive: PathBuf,

        /// Fully qualified class name, e.g. com.example.Main
        class: String,

        /// Modified source file, or `-` to read from stdin
        source: PathBuf,

        /// Additional classpath entries
        #[arg(long = "classpath", value_name = "PATH")]
        classpath: Vec<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a JSON list of patch jobs on the worker pool
    Batch {
        /// Path to the job list
        jobs: PathBuf,

        /// Override the configured number of workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace text in the string constants of every class and write
    /// <name>_STRING_PATCHED.jar beside the archive
    ReplaceString {
        /// Path to the plugin archive (.jar)
        archive: PathBuf,

        /// Text to look for; constants containing it have every occurrence replaced
        from: String,

        /// Replacement text
        to: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show descriptor metadata and the detected target version
    Info {
        /// Path to the plugin archive (.jar)
        archive: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the dependency and classpath that would be used, without compiling
    Resolve {
        /// Path to the plugin archive (.jar)
        archive: PathBuf,

        /// Additional classpath entries
        #[arg(long = "classpath", value_name = "PATH")]
        classpath: Vec<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a Java compiler can be found
    Doctor,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Helper to format jarsmith-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<jarsmith_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    let config = PipelineConfig::load_or_default(cli.config.as_deref())
        .map_err(|e| format_error(e.into()))?;

    match cli.command {
        Commands::Patch {
            archive,
            class,
            source,
            classpath,
            json,
        } => {
            patch::execute(config, &archive, &class, &source, classpath, json)
                .map_err(format_error)?;
        }

        Commands::Batch {
            jobs,
            workers,
            json,
        } => {
            batch::execute(config, &jobs, workers, json).map_err(format_error)?;
        }

        Commands::ReplaceString {
            archive,
            from,
            to,
            json,
        } => {
            replace_string::execute(config, &archive, &from, &to, json).map_err(format_error)?;
        }

        Commands::Info { archive, json } => {
            info::execute(config, &archive, json).map_err(format_error)?;
        }

        Commands::Resolve {
            archive,
            classpath,
            json,
        } => {
            resolve::execute(config, &archive, &classpath, json).map_err(format_error)?;
        }

        Commands::Doctor => doctor::execute(&config).map_err(format_error)?,
    }

    Ok(())
}
