//! Check command - validate configuration and content

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use reweave_core::Config;
use reweave_generator::Builder;
use reweave_parser::SyntaxHighlighter;

/// Validation result.
#[derive(Debug, Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Loads the configuration, renders every document without writing output and
/// reports the ones that would be published as error drafts.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and content");

    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    let config = match Config::load_with_env(config_path) {
        Ok(c) => {
            println!("  ✓ Configuration valid");
            c
        }
        Err(e) => {
            println!("  ✗ Configuration invalid: {e}");
            bail!("Configuration error: {e}");
        }
    };

    check_config_values(&config, &mut result);

    let content_dir = config.build.content_dir.clone();
    if content_dir.is_dir() {
        println!("\nChecking content files...");
        check_documents(&config, &content_dir, &mut result);
        check_stray_files(&content_dir, &mut result);
    } else {
        result.add_error(format!(
            "Content directory missing: {}",
            content_dir.display()
        ));
    }

    println!("\nChecking directories...");
    check_directories(&config, &mut result);

    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Render every source and record the ones that fail.
fn check_documents(config: &Config, content_dir: &Path, result: &mut ValidationResult) {
    let builder = Builder::new(config.clone(), content_dir, &config.build.output_dir);
    match builder.check() {
        Ok(report) => {
            for (path, title) in &report.failures {
                result.add_error(format!("{}: {title}", path.display()));
            }
            if report.is_clean() {
                println!(
                    "  ✓ All {} documents render ({} public)",
                    report.documents, report.public
                );
            } else {
                println!(
                    "  ✗ {}/{} documents have errors",
                    report.failures.len(),
                    report.documents
                );
            }
        }
        Err(e) => result.add_error(format!("Content check failed: {e}")),
    }
}

/// Files in the content directory that will not be rendered.
fn check_stray_files(content_dir: &Path, result: &mut ValidationResult) {
    for entry in walkdir::WalkDir::new(content_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        let is_markdown = path
            .extension()
            .is_some_and(|ext| matches!(ext.to_string_lossy().to_lowercase().as_str(), "md" | "markdown"));

        if !is_markdown && !name.starts_with('.') {
            result.add_warning(format!("{}: not a markdown file, ignored", path.display()));
        }
    }
}

fn check_directories(config: &Config, result: &mut ValidationResult) {
    let static_dir = &config.build.static_dir;
    if static_dir.is_dir() {
        println!("  ✓ {}/ exists", static_dir.display());
    } else {
        result.add_warning(format!("Optional directory missing: {}/", static_dir.display()));
        println!("  ⚠ {}/ missing (optional)", static_dir.display());
    }

    let pages = [("about", &config.pages.about), ("projects", &config.pages.projects)];
    for (name, page) in pages {
        let Some(page) = page else { continue };
        let path = config.build.pages_dir.join(&page.file);
        if path.is_file() {
            println!("  ✓ {name} page source {}", path.display());
        } else {
            result.add_error(format!("{name} page source missing: {}", path.display()));
        }
    }

    let output = &config.build.output_dir;
    if output.exists() && !output.is_dir() {
        result.add_error(format!(
            "Output path exists but is not a directory: {}",
            output.display()
        ));
    }
}

fn check_config_values(config: &Config, result: &mut ValidationResult) {
    if !config.site.base_url.starts_with("http") {
        result.add_warning("site.base_url should start with http:// or https://");
    }

    if config.rss.enabled && config.rss.limit == 0 {
        result.add_warning("rss.limit is 0, the feed will be empty");
    }

    if config.toc.enabled && !(1..=6).contains(&config.toc.max_depth) {
        result.add_warning("toc.max_depth should be between 1 and 6");
    }

    let theme = &config.build.syntax_theme;
    let highlighter = SyntaxHighlighter::new(theme);
    if !highlighter.has_theme(theme) {
        let mut available = highlighter.available_themes();
        available.sort_unstable();
        result.add_warning(format!(
            "build.syntax_theme '{theme}' is not bundled, code blocks fall back to another theme (available: {})",
            available.join(", ")
        ));
    }
}
