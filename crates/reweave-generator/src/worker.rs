//! Per-file render step and the render fan-out/fan-in.

use std::{fs, path::Path, sync::Arc};

use reweave_core::{CoreError, Document};
use reweave_parser::{MarkdownError, MarkdownRenderer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::{PoolError, RenderTask, TaskHandler, WorkerPool};

/// Reasons a single source fails to render.
#[derive(Debug, Error)]
enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Markdown(#[from] MarkdownError),
}

/// Renders one markdown source into a [`Document`].
///
/// Failures never escape: an unreadable or malformed source becomes a draft
/// document flagged as a recovered error.
#[derive(Debug, Clone)]
pub struct RenderWorker {
    renderer: Arc<MarkdownRenderer>,
}

impl RenderWorker {
    pub fn new(renderer: Arc<MarkdownRenderer>) -> Self {
        Self { renderer }
    }

    /// Render a source file.
    pub fn render(&self, task: &RenderTask) -> Document {
        let path = &task.source_path;
        debug!(path = %path.display(), task = task.id, "rendering");

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => return self.recover(task, &RenderError::from(e), ""),
        };

        match self.render_bytes(task, &bytes) {
            Ok(doc) => doc,
            Err(e) => self.recover(task, &e, &String::from_utf8_lossy(&bytes)),
        }
    }

    fn render_bytes(&self, task: &RenderTask, bytes: &[u8]) -> Result<Document, RenderError> {
        let content = decode_utf8(bytes, &task.source_path)?;
        let parsed = self.renderer.parse(content, &task.source_path)?;

        Ok(Document::from_parts(
            parsed.frontmatter,
            task.source_path.clone(),
            task.id,
            parsed.html,
            parsed.outline,
        ))
    }

    fn recover(&self, task: &RenderTask, error: &RenderError, raw: &str) -> Document {
        warn!(
            path = %task.source_path.display(),
            error = %error,
            "render failed, emitting draft error document"
        );
        Document::recovered(task.source_path.clone(), task.id, &error.to_string(), raw)
    }
}

impl TaskHandler for RenderWorker {
    fn handle(&self, task: &RenderTask) -> Document {
        self.render(task)
    }
}

fn decode_utf8<'a>(bytes: &'a [u8], path: &Path) -> Result<&'a str, CoreError> {
    std::str::from_utf8(bytes).map_err(|e| CoreError::encoding(path, e.to_string()))
}

/// Documents produced for a batch of sources.
#[derive(Debug, Default)]
pub struct RenderReport {
    /// One document per source, in scan order.
    pub documents: Vec<Document>,

    /// Sources whose worker crashed and were replaced by placeholders.
    pub crashed: usize,
}

impl RenderReport {
    /// Documents that rendered with a recovered error, placeholders included.
    pub fn recovered(&self) -> usize {
        self.documents.iter().filter(|d| d.is_recovered()).count()
    }
}

/// Submit one task per source and wait for all of them.
///
/// Every source yields exactly one document. Tasks rejected by the pool are
/// replaced with placeholder documents here.
pub fn render_all<H: TaskHandler>(pool: &WorkerPool<H>, sources: &[impl AsRef<Path>]) -> RenderReport {
    info!(count = sources.len(), workers = pool.max_workers(), "rendering sources");

    let handles: Vec<_> = sources
        .iter()
        .enumerate()
        .map(|(id, path)| pool.submit(RenderTask::new(id, path.as_ref())))
        .collect();

    let mut report = RenderReport {
        documents: Vec::with_capacity(handles.len()),
        crashed: 0,
    };

    for (handle, source) in handles.into_iter().zip(sources) {
        let task_id = handle.task_id();
        match handle.wait() {
            Ok(doc) => report.documents.push(doc),
            Err(e) => {
                if matches!(e, PoolError::WorkerCrashed { .. }) {
                    report.crashed += 1;
                }
                report.documents.push(Document::placeholder(
                    source.as_ref().to_path_buf(),
                    task_id,
                    &e.to_string(),
                ));
            }
        }
    }

    info!(
        documents = report.documents.len(),
        recovered = report.recovered(),
        crashed = report.crashed,
        "rendering complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use reweave_core::RenderStatus;

    use super::*;

    fn worker() -> RenderWorker {
        RenderWorker::new(Arc::new(MarkdownRenderer::new()))
    }

    #[test]
    fn test_render_valid_source() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("hello.md");
        fs::write(
            &path,
            "---\ntitle: Hello\ndate: 2024-03-01\ntags: [a, b]\n---\n\n# Intro\n\nBody text.",
        )
        .expect("write");

        let doc = worker().render(&RenderTask::new(5, &path));

        assert_eq!(doc.status, RenderStatus::Ok);
        assert_eq!(doc.title, "Hello");
        assert_eq!(doc.slug, "hello");
        assert_eq!(doc.order, 5);
        assert_eq!(doc.tags, vec!["a", "b"]);
        assert_eq!(doc.outline.len(), 1);
        assert!(doc.html.contains("<h1 id=\"intro\">"));
        assert!(doc.is_public());
    }

    #[test]
    fn test_malformed_frontmatter_recovers() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("broken.md");
        fs::write(&path, "---\ntitle: [oops\n---\n<b>body</b>").expect("write");

        let doc = worker().render(&RenderTask::new(0, &path));

        assert_eq!(doc.status, RenderStatus::RecoveredError);
        assert!(doc.flags.draft);
        assert!(doc.html.contains("render-error"));
        assert!(doc.html.contains("Error rendering content"));
        assert!(doc.html.contains("&lt;b&gt;body&lt;/b&gt;"));
    }

    #[test]
    fn test_invalid_utf8_recovers() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("latin1.md");
        fs::write(&path, b"caf\xe9 au lait").expect("write");

        let doc = worker().render(&RenderTask::new(1, &path));

        assert!(doc.is_recovered());
        assert!(doc.flags.draft);
        assert!(doc.html.contains("Encoding error"));
        assert!(doc.html.contains("caf\u{fffd} au lait"));
    }

    #[test]
    fn test_missing_file_recovers() {
        let doc = worker().render(&RenderTask::new(2, "/nonexistent/ghost.md"));
        assert!(doc.is_recovered());
        assert_eq!(doc.slug, "ghost");
    }

    #[test]
    fn test_render_all_keeps_one_document_per_source() {
        let sources: Vec<PathBuf> = (0..9).map(|i| PathBuf::from(format!("s{i}.md"))).collect();
        let pool = WorkerPool::new(
            |task: &RenderTask| {
                if task.id == 4 {
                    panic!("simulated crash");
                }
                Document::from_parts(
                    reweave_core::Frontmatter::default(),
                    task.source_path.clone(),
                    task.id,
                    String::new(),
                    Vec::new(),
                )
            },
            3,
        );

        let report = render_all(&pool, &sources);

        assert_eq!(report.documents.len(), 9);
        assert_eq!(report.crashed, 1);
        assert_eq!(report.recovered(), 1);
        let orders: Vec<_> = report.documents.iter().map(|d| d.order).collect();
        assert_eq!(orders, (0..9).collect::<Vec<_>>());

        let placeholder = &report.documents[4];
        assert_eq!(placeholder.title, "Build Error");
        assert!(placeholder.html.contains("simulated crash"));
    }
}
