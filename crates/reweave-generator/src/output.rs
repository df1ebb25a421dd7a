//! Output writing.
//!
//! Maps site URLs to files below the output root and writes them, creating
//! each directory at most once per build.

use std::{
    fs,
    io,
    path::{Component, Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use tracing::{debug, trace};

/// Output errors.
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Writing a specific file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// URL escapes the output root.
    #[error("invalid output path: {0}")]
    InvalidPath(String),
}

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Leaf names written as `<name>.html` instead of `<name>/index.html`.
const RESERVED_LEAVES: [&str; 2] = ["index", "404"];

/// Directories already created during this build.
///
/// Concurrent `ensure_dir` calls for the same path perform one creation: the
/// first caller creates the directory while holding the map entry, the rest
/// see it recorded.
#[derive(Debug, Default)]
pub struct DirCache {
    created: DashMap<PathBuf, ()>,
    creations: AtomicUsize,
}

impl DirCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path` and its parents unless already recorded.
    ///
    /// A directory that already exists on disk counts as created.
    pub fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        if self.created.contains_key(path) {
            return Ok(());
        }

        match self.created.entry(path.to_path_buf()) {
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                self.creations.fetch_add(1, Ordering::Relaxed);
                match fs::create_dir_all(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {}
                    Err(e) => return Err(e),
                }
                trace!(dir = %path.display(), "created directory");
                slot.insert(());
                Ok(())
            }
        }
    }

    /// Number of directory creations attempted.
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::Relaxed)
    }

    /// Number of directories recorded.
    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }
}

/// Writes pages and raw artifacts below an output root.
#[derive(Debug)]
pub struct OutputWriter {
    root: PathBuf,
    dirs: DirCache,
}

impl OutputWriter {
    /// Create a writer with an empty directory cache.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dirs: DirCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_cache(&self) -> &DirCache {
        &self.dirs
    }

    /// Remove any previous output and recreate the root directory.
    pub fn clean(&self) -> Result<()> {
        if self.root.exists() {
            debug!(dir = %self.root.display(), "cleaning output directory");
            fs::remove_dir_all(&self.root)?;
        }
        self.dirs.ensure_dir(&self.root)?;
        Ok(())
    }

    /// Physical file for a site URL.
    ///
    /// `/` maps to `index.html`, `/posts/hello` to `posts/hello/index.html`,
    /// and the reserved leaves `index` and `404` to `<path>.html`.
    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        let relative = sanitize(url)?;
        let Some(leaf) = relative.file_name().map(|l| l.to_string_lossy().into_owned()) else {
            return Ok(self.root.join("index.html"));
        };

        if RESERVED_LEAVES.contains(&leaf.as_str()) {
            Ok(self.root.join(relative.with_file_name(format!("{leaf}.html"))))
        } else {
            Ok(self.root.join(relative).join("index.html"))
        }
    }

    /// Write an HTML page for a site URL.
    pub fn write_page(&self, url: &str, html: &str) -> Result<PathBuf> {
        let path = self.resolve(url)?;
        self.write_file(&path, html.as_bytes())?;
        debug!(url, path = %path.display(), "wrote page");
        Ok(path)
    }

    /// Write a file at a path relative to the output root, verbatim.
    pub fn write_raw(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.root.join(sanitize(relative)?);
        self.write_file(&path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(path)
    }

    /// Copy a file into the output root.
    pub fn copy_into(&self, source: &Path, relative: &Path) -> Result<PathBuf> {
        let dest = self
            .root
            .join(sanitize(&relative.to_string_lossy())?);
        if let Some(parent) = dest.parent() {
            self.dirs.ensure_dir(parent)?;
        }
        fs::copy(source, &dest).map_err(|e| OutputError::Write {
            path: dest.clone(),
            source: e,
        })?;
        Ok(dest)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.dirs.ensure_dir(parent)?;
        }
        fs::write(path, contents).map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Normalize a URL or relative path, rejecting anything that leaves the root.
fn sanitize(url: &str) -> Result<PathBuf> {
    let trimmed = url.trim_matches('/');
    let mut out = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return Err(OutputError::InvalidPath(url.to_string())),
        }
    }
    Ok(out)
}
