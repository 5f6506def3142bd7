//! Template composition for Tera.
//!
//! Templates name other templates through two directives embedded in their
//! source: `{{ template "@name" . }}` includes a fragment, and
//! `{{ layout "@name" }}` renders the current template inside a base layout.
//! The crate resolves those directives recursively, compiles the result with
//! Tera, and caches compiled templates so that changing one template evicts
//! everything built on top of it.
//!
//! ```no_run
//! use template_compose::templating::{CacheMode, OutputKind, Runtime};
//! use serde_json::json;
//!
//! let runtime = Runtime::builder().root("templates").cache_mode(CacheMode::Enabled).build();
//! let mut out = Vec::new();
//! runtime.render_html(&mut out, "index.html", &json!({"user": "ada"}))?;
//!
//! // `layouts/base.html` changed on disk: evict it and every page using it.
//! runtime.remove_cache(OutputKind::Html, "layouts/base.html");
//! # Ok::<(), template_compose::templating::ComposeError>(())
//! ```
//!
//! # Modules
//!
//! - [`templating`]: directive scanning, resolution, caching and rendering
//! - [`config`]: TOML runtime configuration
//! - [`cli`]: the `tcompose` command line
//! - [`core`]: user-facing error reporting
//! - [`utils`]: template name normalization

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod templating;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
