//! Source text providers used by the builder's re-scan steps

use st_core::LineageConfig;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Supplies the raw text of a workspace file
pub trait SourceTextProvider {
    /// Read the full text of `file_path` as it appears in the index
    fn read(&self, file_path: &str) -> io::Result<String>;
}

impl<P: SourceTextProvider + ?Sized> SourceTextProvider for Box<P> {
    fn read(&self, file_path: &str) -> io::Result<String> {
        (**self).read(file_path)
    }
}

/// Reads files from disk, resolving relative paths against an optional root
#[derive(Debug, Clone, Default)]
pub struct FsSourceProvider {
    root: Option<PathBuf>,
}

impl FsSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Provider rooted at `builder.source_root`
    pub fn from_config(config: &LineageConfig) -> Self {
        Self {
            root: config.builder.source_root.clone(),
        }
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SourceTextProvider for FsSourceProvider {
    fn read(&self, file_path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(file_path))
    }
}

/// Serves file contents held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceProvider {
    files: HashMap<String, String>,
}

impl InMemorySourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, file_path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(file_path.into(), text.into());
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_file(mut self, file_path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(file_path, text);
        self
    }
}

impl SourceTextProvider for InMemorySourceProvider {
    fn read(&self, file_path: &str) -> io::Result<String> {
        self.files.get(file_path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no in-memory source for '{}'", file_path),
            )
        })
    }
}

/// Memoizes successful reads of an inner provider across builds.
///
/// Failed reads are not cached, so a file that appears later is picked up.
pub struct CachingSourceProvider<P> {
    inner: P,
    cache: RefCell<HashMap<String, String>>,
}

impl<P: SourceTextProvider> CachingSourceProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Forget one file, e.g. after it changed on disk
    pub fn invalidate(&self, file_path: &str) {
        self.cache.borrow_mut().remove(file_path);
    }

    /// Forget everything
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Number of cached files
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<P: SourceTextProvider> SourceTextProvider for CachingSourceProvider<P> {
    fn read(&self, file_path: &str) -> io::Result<String> {
        if let Some(text) = self.cache.borrow().get(file_path) {
            return Ok(text.clone());
        }
        let text = self.inner.read(file_path)?;
        self.cache
            .borrow_mut()
            .insert(file_path.to_string(), text.clone());
        Ok(text)
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
