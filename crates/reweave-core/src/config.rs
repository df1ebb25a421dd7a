//! Site configuration management.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for ReWeave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    pub site: SiteConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Listing pagination.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// RSS feed settings.
    #[serde(default)]
    pub rss: RssConfig,

    /// Table of contents on post pages.
    #[serde(default)]
    pub toc: TocConfig,

    /// Optional standalone pages.
    #[serde(default)]
    pub pages: PagesConfig,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title.
    pub title: String,

    /// Base URL for the site (e.g., "https://example.com").
    pub base_url: String,

    /// Site description for the feed and meta tags.
    #[serde(default)]
    pub description: Option<String>,

    /// Language code advertised in the feed and `<html lang>`.
    #[serde(default = "default_language")]
    pub language: String,

    /// Site author name.
    #[serde(default)]
    pub author: Option<String>,

    /// Built-in theme used for page layout.
    #[serde(default)]
    pub theme: Theme,
}

/// Built-in layout themes.
///
/// Unknown names deserialize to [`Theme::Default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Butterfly,
    Weave,
    Landing,
    Gitbook,
    #[default]
    #[serde(other)]
    Default,
}

impl Theme {
    /// Name used as the `<body>` class of rendered pages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Butterfly => "butterfly",
            Self::Weave => "weave",
            Self::Landing => "landing",
            Self::Gitbook => "gitbook",
        }
    }
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory holding markdown sources.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// Output directory for generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory copied verbatim into the output root.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Directory holding standalone page sources (about, projects).
    #[serde(default = "default_pages_dir")]
    pub pages_dir: PathBuf,

    /// Syntax highlighting theme name.
    #[serde(default = "default_syntax_theme")]
    pub syntax_theme: String,

    /// Upper bound on render workers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Number of pages written per parallel batch.
    #[serde(default = "default_write_chunk_size")]
    pub write_chunk_size: usize,
}

/// Pagination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Documents per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// RSS feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssConfig {
    /// Whether RSS feed is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of items in feed.
    #[serde(default = "default_rss_limit")]
    pub limit: usize,
}

/// Table of contents configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Deepest heading level listed.
    #[serde(default = "default_toc_depth")]
    pub max_depth: u8,
}

/// Standalone pages rendered from `build.pages_dir`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagesConfig {
    #[serde(default)]
    pub about: Option<PageConfig>,

    #[serde(default)]
    pub projects: Option<PageConfig>,
}

/// A single standalone page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Markdown file name relative to `build.pages_dir`.
    pub file: String,

    /// Page title.
    pub title: String,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from("pages")
}

fn default_syntax_theme() -> String {
    "base16-ocean.dark".to_string()
}

fn default_max_workers() -> usize {
    4
}

fn default_write_chunk_size() -> usize {
    20
}

fn default_page_size() -> usize {
    15
}

fn default_true() -> bool {
    true
}

fn default_rss_limit() -> usize {
    20
}

fn default_toc_depth() -> u8 {
    3
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            output_dir: default_output_dir(),
            static_dir: default_static_dir(),
            pages_dir: default_pages_dir(),
            syntax_theme: default_syntax_theme(),
            max_workers: default_max_workers(),
            write_chunk_size: default_write_chunk_size(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: default_rss_limit(),
        }
    }
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: default_toc_depth(),
        }
    }
}

impl Config {
    /// Build a configuration from site metadata, everything else defaulted.
    pub fn new(title: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            site: SiteConfig {
                title: title.into(),
                base_url: base_url.into(),
                description: None,
                language: default_language(),
                author: None,
                theme: Theme::default(),
            },
            build: BuildConfig::default(),
            pagination: PaginationConfig::default(),
            rss: RssConfig::default(),
            toc: TocConfig::default(),
            pages: PagesConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration layered with `REWEAVE__SECTION__KEY` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("REWEAVE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.site.title.is_empty() {
            return Err(CoreError::config("site.title cannot be empty"));
        }

        if self.site.base_url.is_empty() {
            return Err(CoreError::config("site.base_url cannot be empty"));
        }

        if self.pagination.page_size == 0 {
            return Err(CoreError::config("pagination.page_size must be at least 1"));
        }

        if self.build.max_workers == 0 {
            return Err(CoreError::config("build.max_workers must be at least 1"));
        }

        if self.build.write_chunk_size == 0 {
            return Err(CoreError::config(
                "build.write_chunk_size must be at least 1",
            ));
        }

        if self.site.base_url.ends_with('/') {
            tracing::warn!("site.base_url should not have a trailing slash");
        }

        Ok(())
    }

    /// Get the full URL for a path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.site.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Number of render workers for this machine.
    pub fn effective_workers(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        worker_count(cpus, self.build.max_workers)
    }
}

/// `max(1, min(cpus - 1, ceiling))`: one core is left for the orchestrating thread.
pub fn worker_count(cpus: usize, ceiling: usize) -> usize {
    cpus.saturating_sub(1).min(ceiling).max(1)
}
