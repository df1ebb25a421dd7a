//! ReWeave Generator Library
//!
//! The build pipeline: source scanning, the bounded render pool, the
//! content index and everything written to the output directory.
//!
//! # Modules
//!
//! - [`collector`] - Markdown source enumeration
//! - [`pool`] - Bounded worker pool with crash recovery
//! - [`worker`] - Per-file rendering and render fan-out
//! - [`index`] - Sorting, pagination and taxonomy grouping
//! - [`output`] - URL to file mapping and deduplicated directory creation
//! - [`template`] - Layout templates with variable interpolation
//! - [`html`] - Page generation
//! - [`rss`] - RSS feed generation
//! - [`sitemap`] - XML sitemap generation
//! - [`assets`] - Static file copying
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod collector;
pub mod html;
pub mod index;
pub mod output;
pub mod pool;
pub mod rss;
pub mod sitemap;
pub mod template;
pub mod worker;

pub use assets::AssetCopier;
pub use build::{BuildError, BuildStats, Builder, CheckReport};
pub use collector::ContentScanner;
pub use html::HtmlGenerator;
pub use index::{ContentIndex, SiteStats, TaxonomyGroup};
pub use output::{DirCache, OutputWriter};
pub use pool::{PoolError, PoolStats, RenderTask, TaskHandle, TaskHandler, WorkerPool};
pub use rss::RssGenerator;
pub use sitemap::SitemapGenerator;
pub use template::{Template, TemplateContext, TemplateRegistry};
pub use worker::{RenderReport, RenderWorker, render_all};
