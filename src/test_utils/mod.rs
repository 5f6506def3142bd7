//! Helpers for tests of this crate and of crates embedding it.
//!
//! Enabled for unit tests and, through the `test-utils` feature, for the
//! integration suite.
//!
//! ```rust,no_run
//! use template_compose::templating::{CacheMode, OutputKind};
//! use template_compose::test_utils::{init_test_logging, memory_runtime};
//!
//! init_test_logging(None);
//! let (reader, runtime) = memory_runtime(&[("page", "hi {{ who }}")], CacheMode::Enabled);
//! reader.insert("other", "x");
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::templating::{CacheMode, MemoryReader, Runtime, TemplateReader};

static INIT_LOGGING: Once = Once::new();

/// Install a subscriber that prints this crate's resolution logs in test
/// output.
///
/// `level` applies to `template_compose` only, so logs from Tera and other
/// dependencies stay quiet. Without a level `RUST_LOG` is used, and with
/// neither nothing is installed. Only the first call in a test binary has an
/// effect. Thread names are shown because several suites render from many
/// threads at once.
///
/// ```bash
/// RUST_LOG=template_compose::templating::cache=trace cargo test concurrency
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let Some(filter) = test_log_filter(level) else {
            return;
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_names(true)
            .without_time()
            .try_init();
    });
}

fn test_log_filter(level: Option<Level>) -> Option<EnvFilter> {
    match level {
        Some(level) => Some(EnvFilter::new(format!("{}={level}", env!("CARGO_CRATE_NAME")))),
        None => EnvFilter::try_from_default_env().ok(),
    }
}

/// A runtime reading from an in-memory store the test can keep editing.
pub fn memory_runtime(templates: &[(&str, &str)], mode: CacheMode) -> (Arc<MemoryReader>, Runtime) {
    let reader = Arc::new(MemoryReader::with_templates(templates.iter().copied()));
    let runtime = Runtime::builder()
        .shared_reader(Arc::clone(&reader) as Arc<dyn TemplateReader>)
        .cache_mode(mode)
        .build();
    (reader, runtime)
}

/// Template files in a temporary directory, removed on drop.
pub struct TemplateDir {
    temp: TempDir,
}

impl TemplateDir {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp: TempDir::new()?,
        })
    }

    /// Create a directory holding `templates`.
    pub fn with_templates(templates: &[(&str, &str)]) -> std::io::Result<Self> {
        let dir = Self::new()?;
        for (name, source) in templates {
            dir.write(name, source)?;
        }
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write a template, creating parent directories.
    pub fn write(&self, name: &str, source: &str) -> std::io::Result<PathBuf> {
        let path = self.temp.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, source)?;
        Ok(path)
    }

    pub fn runtime(&self, mode: CacheMode) -> Runtime {
        Runtime::builder().root(self.path()).cache_mode(mode).build()
    }
}
