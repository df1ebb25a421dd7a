//! Build orchestration.
//!
//! Runs the pipeline: scan, clean, render on the worker pool, index, write
//! pages in parallel chunks, then feeds, sitemap and static assets.

use std::{
    fs,
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use rayon::prelude::*;
use reweave_core::{Config, CoreError};
use reweave_parser::{MarkdownError, MarkdownRenderer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::{AssetCopier, AssetError},
    collector::{CollectorError, ContentScanner},
    html::{HtmlError, HtmlGenerator, TaxonomyKind, listing_url},
    index::ContentIndex,
    output::{OutputError, OutputWriter},
    pool::{PoolStats, WorkerPool},
    rss::{RssError, RssGenerator},
    sitemap::{SitemapError, SitemapGenerator},
    worker::{RenderReport, RenderWorker, render_all},
};

/// Build errors. Any of these aborts the build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(#[from] CoreError),

    /// Content directory could not be scanned.
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// Output could not be written.
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// HTML generation error.
    #[error("HTML error: {0}")]
    Html(#[from] HtmlError),

    /// Standalone page failed to render.
    #[error("markdown error: {0}")]
    Markdown(#[from] MarkdownError),

    /// RSS generation error.
    #[error("RSS error: {0}")]
    Rss(#[from] RssError),

    /// Sitemap generation error.
    #[error("sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Source files found, and documents produced for them.
    pub documents: usize,

    /// Documents listed publicly.
    pub public: usize,

    /// Documents that rendered with a recovered error.
    pub recovered: usize,

    /// Tasks whose worker crashed.
    pub crashed: usize,

    /// HTML pages written, taxonomy pages included.
    pub pages: usize,

    /// Category and tag pages written, index pages included.
    pub taxonomy_pages: usize,

    /// Static files copied.
    pub assets: usize,

    /// Output directories created.
    pub dirs_created: usize,

    pub pool: PoolStats,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Outcome of rendering without writing anything.
#[derive(Debug)]
pub struct CheckReport {
    /// Source files rendered.
    pub documents: usize,

    /// Documents that would be published.
    pub public: usize,

    /// Sources that failed to render, with the rendered error title.
    pub failures: Vec<(PathBuf, String)>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One HTML page to write.
#[derive(Debug, Clone)]
enum PageJob {
    Post(usize),
    Listing { page: usize, url: String },
    Term { kind: TaxonomyKind, group: usize },
    Terms(TaxonomyKind),
    Archive,
    Stats,
    Standalone { title: String, url: String, html: String },
    NotFound,
}

impl PageJob {
    fn is_taxonomy(&self) -> bool {
        matches!(self, Self::Term { .. } | Self::Terms(_))
    }
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    content_dir: PathBuf,
    output_dir: PathBuf,
    static_dir: PathBuf,
    pages_dir: PathBuf,
}

impl Builder {
    /// Create a builder. Static files and standalone pages are read from the
    /// directories named in the configuration.
    #[must_use]
    pub fn new(
        config: Config,
        content_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let static_dir = config.build.static_dir.clone();
        let pages_dir = config.build.pages_dir.clone();
        Self {
            config,
            content_dir: content_dir.into(),
            output_dir: output_dir.into(),
            static_dir,
            pages_dir,
        }
    }

    /// Set the static assets directory.
    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    /// Set the directory holding the about and projects sources.
    #[must_use]
    pub fn with_pages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pages_dir = dir.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        self.config.validate()?;

        info!(
            content = %self.content_dir.display(),
            output = %self.output_dir.display(),
            "starting build"
        );

        // 1. Enumerate sources
        let sources = ContentScanner::new(&self.content_dir).scan()?;

        // 2. Clean output directory
        let writer = OutputWriter::new(&self.output_dir);
        writer.clean()?;

        // 3. Render on the worker pool
        let renderer = Arc::new(MarkdownRenderer::with_theme(&self.config.build.syntax_theme));
        let (report, pool_stats) = self.render_sources(Arc::clone(&renderer), &sources);
        stats.documents = report.documents.len();
        stats.recovered = report.recovered();
        stats.crashed = report.crashed;
        stats.pool = pool_stats;

        // 4. Index
        let index = ContentIndex::build(report.documents, self.config.pagination.page_size);
        stats.public = index.ordered().len();

        // 5. HTML pages
        let jobs = self.plan_pages(&index, &renderer)?;
        stats.taxonomy_pages = jobs.iter().filter(|j| j.is_taxonomy()).count();
        stats.pages = self.write_pages(&index, &writer, &jobs)?;

        // 6. RSS feed
        if self.config.rss.enabled {
            let mut xml = Vec::new();
            RssGenerator::new(&self.config).write_to(&index, &mut xml)?;
            let path = writer.write_raw("rss.xml", &xml)?;
            info!(path = %path.display(), "generated RSS feed");
        }

        // 7. Sitemap
        let mut xml = Vec::new();
        SitemapGenerator::new(&self.config).write_to(&index, &mut xml)?;
        let path = writer.write_raw("sitemap.xml", &xml)?;
        info!(path = %path.display(), "generated sitemap");

        // 8. Static assets
        stats.assets = AssetCopier::new(&writer).copy_dir(&self.static_dir)?;

        stats.dirs_created = writer.dir_cache().creations();
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            documents = stats.documents,
            public = stats.public,
            recovered = stats.recovered,
            crashed = stats.crashed,
            pages = stats.pages,
            taxonomy_pages = stats.taxonomy_pages,
            assets = stats.assets,
            dirs_created = stats.dirs_created,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Render every source without writing output.
    pub fn check(&self) -> Result<CheckReport> {
        self.config.validate()?;

        let sources = ContentScanner::new(&self.content_dir).scan()?;
        let renderer = Arc::new(MarkdownRenderer::with_theme(&self.config.build.syntax_theme));
        let (report, _) = self.render_sources(renderer, &sources);

        let failures = report
            .documents
            .iter()
            .filter(|d| d.is_recovered())
            .map(|d| (d.source_path.clone(), d.title.clone()))
            .collect();

        Ok(CheckReport {
            documents: report.documents.len(),
            public: report.documents.iter().filter(|d| d.is_public()).count(),
            failures,
        })
    }

    fn render_sources(
        &self,
        renderer: Arc<MarkdownRenderer>,
        sources: &[PathBuf],
    ) -> (RenderReport, PoolStats) {
        let pool = WorkerPool::new(RenderWorker::new(renderer), self.config.effective_workers());
        let report = render_all(&pool, sources);
        pool.close();
        let pool_stats = pool.stats();

        debug!(
            spawned = pool_stats.workers_spawned,
            crashed = pool_stats.workers_crashed,
            peak_busy = pool_stats.peak_busy,
            "worker pool finished"
        );

        (report, pool_stats)
    }

    /// Every page the site consists of.
    fn plan_pages(&self, index: &ContentIndex, renderer: &MarkdownRenderer) -> Result<Vec<PageJob>> {
        let mut jobs: Vec<PageJob> = (0..index.ordered().len()).map(PageJob::Post).collect();

        let total = index.total_pages().max(1);
        jobs.push(PageJob::Listing {
            page: 1,
            url: "/articles".to_string(),
        });
        jobs.extend((1..=total).map(|page| PageJob::Listing {
            page,
            url: listing_url(page),
        }));

        for kind in [TaxonomyKind::Category, TaxonomyKind::Tag] {
            let groups = match kind {
                TaxonomyKind::Category => index.categories(),
                TaxonomyKind::Tag => index.tags(),
            };
            jobs.extend((0..groups.len()).map(|group| PageJob::Term { kind, group }));
            jobs.push(PageJob::Terms(kind));
        }

        jobs.push(PageJob::Archive);
        jobs.push(PageJob::Stats);
        jobs.push(PageJob::NotFound);

        let pages = &self.config.pages;
        for (page, url) in [(&pages.about, "/about"), (&pages.projects, "/projects")] {
            let Some(page) = page else { continue };
            let path = self.pages_dir.join(&page.file);
            match fs::read_to_string(&path) {
                Ok(source) => {
                    let parsed = renderer.parse(&source, &path)?;
                    jobs.push(PageJob::Standalone {
                        title: page.title.clone(),
                        url: url.to_string(),
                        html: parsed.html,
                    });
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping standalone page"),
            }
        }

        debug!(count = jobs.len(), "planned pages");
        Ok(jobs)
    }

    /// Render and write pages, `write_chunk_size` at a time.
    fn write_pages(&self, index: &ContentIndex, writer: &OutputWriter, jobs: &[PageJob]) -> Result<usize> {
        let generator = HtmlGenerator::new(&self.config);
        let chunk_size = self.config.build.write_chunk_size.max(1);

        info!(count = jobs.len(), chunk_size, "writing pages");

        for chunk in jobs.chunks(chunk_size) {
            chunk
                .par_iter()
                .try_for_each(|job| write_page(&generator, index, writer, job))?;
        }

        Ok(jobs.len())
    }
}

fn write_page(
    generator: &HtmlGenerator<'_>,
    index: &ContentIndex,
    writer: &OutputWriter,
    job: &PageJob,
) -> Result<()> {
    let (url, html) = match job {
        PageJob::Post(position) => {
            let url = index.ordered()[*position].url();
            (url, generator.post_page(index, *position)?)
        }
        PageJob::Listing { page, url } => {
            let docs = index.page(*page).unwrap_or(&[]);
            let total = index.total_pages().max(1);
            (url.clone(), generator.listing_page(docs, *page, total)?)
        }
        PageJob::Term { kind, group } => {
            let groups = match kind {
                TaxonomyKind::Category => index.categories(),
                TaxonomyKind::Tag => index.tags(),
            };
            let group = &groups[*group];
            let members: Vec<_> = index.members(group).collect();
            (kind.term_url(&group.slug), generator.term_page(*kind, group, &members)?)
        }
        PageJob::Terms(kind) => {
            let groups = match kind {
                TaxonomyKind::Category => index.categories(),
                TaxonomyKind::Tag => index.tags(),
            };
            (format!("/{}", kind.route()), generator.terms_page(*kind, groups)?)
        }
        PageJob::Archive => ("/archive".to_string(), generator.archive_page(index)?),
        PageJob::Stats => ("/stats".to_string(), generator.stats_page(index, &index.stats())?),
        PageJob::Standalone { title, url, html } => {
            (url.clone(), generator.static_page(title, url, html)?)
        }
        PageJob::NotFound => ("/404".to_string(), generator.not_found_page()?),
    };

    writer.write_page(&url, &html)?;
    Ok(())
}
