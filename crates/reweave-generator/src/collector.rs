//! Source enumeration.
//!
//! Walks the content directory and lists every markdown source in a stable
//! order. The scan index of a file becomes its document's tie-break order.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

/// Content scanning errors.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The content directory does not exist or is not a directory.
    #[error("content directory not found: {0}")]
    MissingContentDir(PathBuf),
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Enumerates markdown sources below a content directory.
#[derive(Debug, Clone)]
pub struct ContentScanner {
    content_dir: PathBuf,
}

impl ContentScanner {
    /// Create a new scanner.
    #[must_use]
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// List all sources, sorted by path.
    ///
    /// Hidden files and directories are skipped. A missing content directory
    /// is an error rather than an empty site.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.content_dir.is_dir() {
            return Err(CollectorError::MissingContentDir(self.content_dir.clone()));
        }

        info!(dir = %self.content_dir.display(), "scanning content");

        let mut files = Vec::new();
        walk_dir(&self.content_dir, &mut files)?;
        files.sort();

        info!(count = files.len(), "found content files");
        Ok(files)
    }
}

/// Recursively walk a directory for markdown files.
fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if entry
            .file_name()
            .to_string_lossy()
            .starts_with('.')
        {
            continue;
        }

        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if path.is_file() && is_markdown(&path) {
            debug!(path = %path.display(), "found source");
            files.push(path);
        }
    }

    Ok(())
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| matches!(ext.to_string_lossy().to_lowercase().as_str(), "md" | "markdown"))
}
