//! ReWeave CLI
//!
//! Parallel markdown static site generator.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for ReWeave.
#[derive(Parser)]
#[command(
    name = "reweave",
    version,
    about = "A parallel markdown static site generator"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "reweave.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the site
    Build {
        /// Output directory (overrides build.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Content directory (overrides build.content_dir)
        #[arg(long)]
        content: Option<PathBuf>,
    },
    /// Validate configuration and render every document without writing
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    reweave::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { output, content } => {
            reweave::cmd::build::run(&cli.config, output.as_deref(), content.as_deref())?;
        }
        Commands::Check { strict } => {
            reweave::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}
