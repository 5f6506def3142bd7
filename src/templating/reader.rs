//! Template sources.
//!
//! A [`TemplateReader`] turns a normalized template name into raw bytes. Errors
//! are plain [`io::Error`]s; the resolver passes them through untouched, so a
//! caller can still tell a missing template (`NotFound`) from anything else.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::constants::DIRECTORY_INDEX;
use crate::utils::paths::{normalize_name, resolve_under_root};

/// Source of raw template text.
pub trait TemplateReader: Send + Sync {
    /// Raw bytes of the template `name`, which is already normalized.
    ///
    /// A missing template should fail with [`io::ErrorKind::NotFound`].
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;
}

impl<F> TemplateReader for F
where
    F: Fn(&str) -> io::Result<Vec<u8>> + Send + Sync,
{
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self(name)
    }
}

/// Reads templates from files under a root directory.
///
/// Absolute names are taken relative to the root. A name that designates a
/// directory reads that directory's [`DIRECTORY_INDEX`]. Names that would
/// leave the root fail with [`io::ErrorKind::PermissionDenied`].
#[derive(Debug, Clone)]
pub struct FsReader {
    /// Directory every template name is resolved under.
    root: PathBuf,
}

impl FsReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Directory templates are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a template name maps to.
    pub fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        let path = resolve_under_root(&self.root, name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("template name `{name}` escapes {}", self.root.display()),
            )
        })?;

        if name.ends_with('/') || path.is_dir() {
            Ok(path.join(DIRECTORY_INDEX))
        } else {
            Ok(path)
        }
    }
}

impl TemplateReader for FsReader {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self.path_for(name)?;
        tracing::trace!(template = %name, path = %path.display(), "reading template");
        std::fs::read(&path)
    }
}

/// Thread-safe in-memory template store.
///
/// Names are normalized on insert and lookup.
#[derive(Debug, Default)]
pub struct MemoryReader {
    /// Template sources keyed by normalized name.
    sources: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(name, source)` pairs.
    pub fn with_templates<I, N, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: Into<Vec<u8>>,
    {
        let reader = Self::new();
        for (name, source) in templates {
            reader.insert(name.as_ref(), source);
        }
        reader
    }

    /// Add or replace a template, returning the previous source.
    pub fn insert(&self, name: &str, source: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_name(name), source.into())
    }

    /// Drop a template; later reads of it fail with `NotFound`.
    pub fn remove(&self, name: &str) -> Option<Vec<u8>> {
        self.sources.write().unwrap_or_else(PoisonError::into_inner).remove(&normalize_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.read().unwrap_or_else(PoisonError::into_inner).contains_key(&normalize_name(name))
    }
}

impl TemplateReader for MemoryReader {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_name(name))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("template `{name}` not found"))
            })
    }
}
