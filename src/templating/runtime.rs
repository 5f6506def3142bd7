//! Render entry points.
//!
//! A [`Runtime`] owns one reader, one function library and two independent
//! renderers, one per [`OutputKind`]. Each renderer has its own engine and its
//! own cache, so evicting an HTML template leaves the text cache untouched.
//!
//! ```no_run
//! use template_compose::templating::{CacheMode, OutputKind, Runtime};
//! use serde_json::json;
//!
//! let runtime = Runtime::builder().root("templates").cache_mode(CacheMode::Enabled).build();
//! let page = runtime.render_to_string(OutputKind::Html, "index.html", &json!({"title": "Home"}))?;
//! # Ok::<(), template_compose::templating::ComposeError>(())
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use super::cache::{CacheMode, CompiledNode, TemplateCache};
use super::engine::{Engine, EngineError, HtmlEngine, TeraTemplate, TextEngine};
use super::error::ComposeError;
use super::filters::FunctionLibrary;
use super::reader::{FsReader, TemplateReader};
use super::resolver::Resolver;
use crate::config::RuntimeConfig;
use crate::constants::DEFAULT_TEMPLATE_ROOT;
use crate::utils::paths::normalize_name;

/// Which engine a template is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Values are written verbatim.
    #[default]
    Text,
    /// Values are HTML-escaped.
    Html,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Html => f.write_str("html"),
        }
    }
}

/// An engine paired with the cache of the artifacts it compiled.
///
/// The runtime holds one renderer per [`OutputKind`]; a renderer on its own
/// has no reader or library and borrows both from the runtime on each call.
pub struct Renderer<E: Engine> {
    /// Compiles and executes artifacts.
    engine: E,
    /// Artifacts this engine compiled, keyed by normalized name.
    cache: Arc<dyn TemplateCache<E::Artifact>>,
}

impl<E: Engine> Renderer<E> {
    /// Pair `engine` with `cache`. The cache must not be shared with a
    /// renderer for another engine, since artifacts are engine specific.
    pub fn new(engine: E, cache: Arc<dyn TemplateCache<E::Artifact>>) -> Self {
        Self {
            engine,
            cache,
        }
    }

    /// The cache this renderer commits to.
    pub fn cache(&self) -> &dyn TemplateCache<E::Artifact> {
        self.cache.as_ref()
    }

    /// Cached node for `name`, resolved from `reader` on a miss.
    fn resolve(
        &self,
        reader: &dyn TemplateReader,
        library: &FunctionLibrary,
        name: &str,
    ) -> Result<Arc<CompiledNode<E::Artifact>>, ComposeError> {
        Resolver::new(&self.engine, reader, self.cache.as_ref(), library).resolve(name)
    }

    /// Resolve `name` and execute its root definition into `writer`.
    ///
    /// A template whose root definition is blank (for instance one holding
    /// only `define` blocks) fails with [`EngineError::Incomplete`].
    fn render(
        &self,
        reader: &dyn TemplateReader,
        library: &FunctionLibrary,
        writer: &mut dyn Write,
        name: &str,
        data: &serde_json::Value,
    ) -> Result<(), ComposeError> {
        let node = self.resolve(reader, library, name)?;
        let execute_error = |source| ComposeError::Execute {
            name: node.name().to_string(),
            source,
        };

        if self.engine.is_empty(node.artifact()) {
            return Err(execute_error(EngineError::Incomplete {
                template: node.name().to_string(),
            }));
        }
        self.engine.execute(node.artifact(), writer, data).map_err(execute_error)
    }

    /// Evict `name` and its dependents. Returns whether anything was cached.
    fn remove(&self, name: &str) -> bool {
        let evicted = self.cache.invalidate(&normalize_name(name));
        !evicted.is_empty()
    }
}

/// Thread-safe template renderer.
///
/// Share one runtime behind an [`Arc`]; every method takes `&self`.
pub struct Runtime {
    /// Source of every template, shared by both renderers.
    reader: Arc<dyn TemplateReader>,
    /// Filters and functions registered on every compiled template.
    library: FunctionLibrary,
    /// Renderer for [`OutputKind::Text`].
    text: Renderer<TextEngine>,
    /// Renderer for [`OutputKind::Html`].
    html: Renderer<HtmlEngine>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("library", &self.library)
            .field("text_cached", &self.text.cache().len())
            .field("html_cached", &self.html.cache().len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Files under the current directory, builtin helpers, no caching.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a runtime; see [`RuntimeBuilder`] for the defaults.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Files under the configured root, with the configured cache mode.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::builder().root(config.root.clone()).cache_mode(config.cache).build()
    }

    /// Render `name` with the engine selected by `kind`.
    ///
    /// `data` must serialize to a JSON object or to `null`.
    pub fn render_as<W, D>(
        &self,
        kind: OutputKind,
        writer: &mut W,
        name: &str,
        data: &D,
    ) -> Result<(), ComposeError>
    where
        W: Write,
        D: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data).map_err(ComposeError::Data)?;
        tracing::debug!(template = %name, kind = %kind, "rendering");
        let reader = self.reader.as_ref();
        match kind {
            OutputKind::Text => self.text.render(reader, &self.library, writer, name, &data),
            OutputKind::Html => self.html.render(reader, &self.library, writer, name, &data),
        }
    }

    /// Render `name` without escaping.
    pub fn render_text<W, D>(&self, writer: &mut W, name: &str, data: &D) -> Result<(), ComposeError>
    where
        W: Write,
        D: Serialize + ?Sized,
    {
        self.render_as(OutputKind::Text, writer, name, data)
    }

    /// Render `name`, HTML-escaping interpolated values.
    pub fn render_html<W, D>(&self, writer: &mut W, name: &str, data: &D) -> Result<(), ComposeError>
    where
        W: Write,
        D: Serialize + ?Sized,
    {
        self.render_as(OutputKind::Html, writer, name, data)
    }

    /// Render into a `String`.
    pub fn render_to_string<D>(&self, kind: OutputKind, name: &str, data: &D) -> Result<String, ComposeError>
    where
        D: Serialize + ?Sized,
    {
        let mut out = Vec::new();
        self.render_as(kind, &mut out, name, data)?;
        String::from_utf8(out).map_err(|source| ComposeError::Encoding {
            name: normalize_name(name),
            source,
        })
    }

    /// Resolve and cache `name` without executing it.
    ///
    /// Returns the template's direct dependencies.
    pub fn prepare(&self, kind: OutputKind, name: &str) -> Result<Vec<String>, ComposeError> {
        let reader = self.reader.as_ref();
        let dependencies = match kind {
            OutputKind::Text => self.text.resolve(reader, &self.library, name)?.dependency_names(),
            OutputKind::Html => self.html.resolve(reader, &self.library, name)?.dependency_names(),
        };
        Ok(dependencies)
    }

    /// Evict `name` and everything built on it from the `kind` cache.
    ///
    /// Returns whether `name` was cached.
    pub fn remove_cache(&self, kind: OutputKind, name: &str) -> bool {
        let removed = match kind {
            OutputKind::Text => self.text.remove(name),
            OutputKind::Html => self.html.remove(name),
        };
        if removed {
            tracing::debug!(template = %name, kind = %kind, "removed from cache");
        }
        removed
    }

    /// [`remove_cache`](Self::remove_cache) on the text cache.
    pub fn remove_cache_text(&self, name: &str) -> bool {
        self.remove_cache(OutputKind::Text, name)
    }

    /// [`remove_cache`](Self::remove_cache) on the HTML cache.
    pub fn remove_cache_html(&self, name: &str) -> bool {
        self.remove_cache(OutputKind::Html, name)
    }

    /// Cache of compiled artifacts for `kind`.
    pub fn cache(&self, kind: OutputKind) -> &dyn TemplateCache<TeraTemplate> {
        match kind {
            OutputKind::Text => self.text.cache(),
            OutputKind::Html => self.html.cache(),
        }
    }

    /// Helpers available to every template.
    pub fn library(&self) -> &FunctionLibrary {
        &self.library
    }
}

/// Builder for [`Runtime`].
///
/// Unset parts default to files under the current directory, the builtin
/// helpers and [`CacheMode::Disabled`].
#[derive(Default)]
pub struct RuntimeBuilder {
    /// Template source; `None` means an [`FsReader`] on the default root.
    reader: Option<Arc<dyn TemplateReader>>,
    /// Helpers; `None` means [`FunctionLibrary::builtins`].
    library: Option<FunctionLibrary>,
    /// Applied to the text and the HTML cache alike.
    cache_mode: CacheMode,
}

impl RuntimeBuilder {
    /// Read templates with `reader`.
    pub fn reader(mut self, reader: impl TemplateReader + 'static) -> Self {
        self.reader = Some(Arc::new(reader));
        self
    }

    /// Read templates with a reader the caller keeps a handle to.
    pub fn shared_reader(mut self, reader: Arc<dyn TemplateReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Read templates from files under `root`.
    pub fn root(self, root: impl Into<PathBuf>) -> Self {
        self.reader(FsReader::new(root))
    }

    /// Replace the builtin helpers.
    pub fn library(mut self, library: FunctionLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// Whether compiled templates are kept between renders.
    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Finish the runtime. Each output kind gets its own, empty cache.
    pub fn build(self) -> Runtime {
        let reader = self.reader.unwrap_or_else(|| Arc::new(FsReader::new(DEFAULT_TEMPLATE_ROOT)));
        let library = self.library.unwrap_or_else(FunctionLibrary::builtins);
        tracing::debug!(cache = %self.cache_mode, "building template runtime");
        Runtime {
            reader,
            library,
            text: Renderer::new(TextEngine, self.cache_mode.build()),
            html: Renderer::new(HtmlEngine, self.cache_mode.build()),
        }
    }
}
