//! Template composition on top of Tera.
//!
//! Templates are composed from other templates with two directives:
//!
//! - `{{ template "@partials/nav.html" . }}` includes the definition
//!   `@partials/nav.html`, declared by the template of the same name with
//!   `{{ define "@partials/nav.html" }}...{{ end }}`
//! - `{{ layout "@layouts/base.html" }}` renders this template's definitions
//!   inside `layouts/base.html`, whose body refers to them with ordinary
//!   `{{ template "content" . }}` actions
//!
//! # Example
//!
//! `layouts/base.html`:
//! ```text
//! <html><body>{{ template "@partials/nav.html" . }}{{ template "content" . }}</body></html>
//! ```
//!
//! `partials/nav.html`:
//! ```text
//! {{ define "@partials/nav.html" }}<nav>{{ title }}</nav>{{ end }}
//! ```
//!
//! `index.html`:
//! ```text
//! {{ layout "@layouts/base.html" }}
//! {{ define "content" }}<p>Welcome, {{ user }}</p>{{ end }}
//! ```
//!
//! Rendering `index.html` resolves the layout, which pulls in the navigation
//! partial, and fills the layout's `content` slot from `index.html`.
//!
//! # Modules
//!
//! - [`scanner`]: finds directives in raw template text
//! - [`resolver`]: resolves directives recursively and builds artifacts
//! - [`cache`]: compiled templates with cascading invalidation
//! - [`engine`]: the engine interface and its Tera implementations
//! - [`filters`]: helper filters and functions available to every template
//! - [`reader`]: template sources
//! - [`runtime`]: the public render and cache-eviction entry points
//!
//! Invalidating a template through [`Runtime::remove_cache`] also evicts every
//! template that includes it or uses it as a layout, transitively.

pub mod cache;
pub mod engine;
pub mod error;
pub mod filters;
pub mod reader;
pub mod resolver;
pub mod runtime;
pub mod scanner;

pub use cache::{CacheMode, CompiledNode, DependencyCache, NopCache, TemplateCache};
pub use engine::{Engine, EngineError, HtmlEngine, TeraTemplate, TextEngine};
pub use error::ComposeError;
pub use filters::FunctionLibrary;
pub use reader::{FsReader, MemoryReader, TemplateReader};
pub use resolver::{ResolutionContext, Resolver};
pub use runtime::{OutputKind, Renderer, Runtime, RuntimeBuilder};
pub use scanner::{Directive, DirectiveKind, DirectiveScanner};
