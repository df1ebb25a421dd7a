//! Build command - generates the static site

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use reweave_core::Config;
use reweave_generator::{BuildStats, Builder};

/// Run the build command.
///
/// `output` and `content` override the directories from the configuration.
pub fn run(config_path: &Path, output: Option<&Path>, content: Option<&Path>) -> Result<BuildStats> {
    let start = Instant::now();
    tracing::info!(?config_path, ?output, ?content, "Starting build");

    let mut config =
        Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;

    if let Some(dir) = output {
        config.build.output_dir = dir.to_path_buf();
    }
    if let Some(dir) = content {
        config.build.content_dir = dir.to_path_buf();
    }

    tracing::debug!(?config, "Loaded configuration");

    let content_dir = config.build.content_dir.clone();
    let output_dir = config.build.output_dir.clone();
    let stats = Builder::new(config, &content_dir, &output_dir)
        .build()
        .wrap_err("Build failed")?;

    let duration = start.elapsed();

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Documents:  {} ({} public)", stats.documents, stats.public);
    if stats.recovered > 0 {
        println!("  Recovered:  {} (rendered as error drafts)", stats.recovered);
    }
    if stats.crashed > 0 {
        println!("  Crashed:    {}", stats.crashed);
    }
    println!("  Pages:      {}", stats.pages);
    println!("  Taxonomies: {}", stats.taxonomy_pages);
    println!("  Assets:     {}", stats.assets);
    println!();
    println!("  Duration:   {:.2}s", duration.as_secs_f64());
    println!("  Output:     {}", output_dir.display());
    println!();

    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(stats)
}
