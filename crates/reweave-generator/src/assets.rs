//! Static asset copying.
//!
//! Mirrors the static directory into the output root through the
//! [`OutputWriter`], so asset directories share the build's directory cache.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

use crate::output::{OutputError, OutputWriter};

/// Asset copying errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output error.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Asset path outside the static directory.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Copies a static directory into the output.
#[derive(Debug)]
pub struct AssetCopier<'a> {
    writer: &'a OutputWriter,
}

impl<'a> AssetCopier<'a> {
    #[must_use]
    pub fn new(writer: &'a OutputWriter) -> Self {
        Self { writer }
    }

    /// Copy every non-hidden file below `source_dir`, keeping relative paths.
    ///
    /// A missing source directory copies nothing. Returns the file count.
    pub fn copy_dir(&self, source_dir: &Path) -> Result<usize> {
        if !source_dir.is_dir() {
            debug!(dir = %source_dir.display(), "static directory does not exist, skipping");
            return Ok(0);
        }

        info!(source = %source_dir.display(), "copying static assets");
        let count = self.copy_recursive(source_dir, source_dir)?;
        info!(count, "assets copied");
        Ok(count)
    }

    fn copy_recursive(&self, base_dir: &Path, current_dir: &Path) -> Result<usize> {
        let mut count = 0;

        for entry in fs::read_dir(current_dir)? {
            let entry = entry?;
            let path = entry.path();

            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            if path.is_dir() {
                count += self.copy_recursive(base_dir, &path)?;
            } else if path.is_file() {
                let relative = path
                    .strip_prefix(base_dir)
                    .map_err(|_| AssetError::InvalidPath(path.clone()))?;
                let dest = self.writer.copy_into(&path, relative)?;
                debug!(src = %path.display(), dest = %dest.display(), "copied asset");
                count += 1;
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_copy_dir_recursively() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        fs::create_dir_all(source.path().join("css/vendor")).unwrap();
        fs::write(source.path().join("favicon.ico"), b"icon").unwrap();
        fs::write(source.path().join("css/site.css"), "body {}").unwrap();
        fs::write(source.path().join("css/vendor/reset.css"), "* {}").unwrap();
        fs::write(source.path().join(".DS_Store"), "junk").unwrap();

        let writer = OutputWriter::new(dest.path());
        let count = AssetCopier::new(&writer).copy_dir(source.path()).unwrap();

        assert_eq!(count, 3);
        assert_eq!(fs::read(dest.path().join("favicon.ico")).unwrap(), b"icon");
        assert_eq!(
            fs::read_to_string(dest.path().join("css/vendor/reset.css")).unwrap(),
            "* {}"
        );
        assert!(!dest.path().join(".DS_Store").exists());
    }

    #[test]
    fn test_missing_static_dir_copies_nothing() {
        let dest = TempDir::new().unwrap();
        let writer = OutputWriter::new(dest.path());

        let count = AssetCopier::new(&writer)
            .copy_dir(&dest.path().join("no-such-dir"))
            .unwrap();

        assert_eq!(count, 0);
    }
}
