//! Template engine capability interface.
//!
//! The resolver never parses template syntax itself. Everything past directive
//! scanning (building definitions, merging them, parsing, escaping, executing)
//! goes through an [`Engine`]. Two engines are provided, both backed by Tera:
//!
//! - [`TextEngine`]: output is written verbatim
//! - [`HtmlEngine`]: every interpolated value is HTML-escaped
//!
//! The resolver and the cache are generic over the engine's artifact type and
//! never inspect which engine is in use.

pub mod tera_engine;

use serde_json::Value;
use std::io::Write;
use thiserror::Error;

use crate::templating::filters::FunctionLibrary;

pub use tera_engine::{HtmlEngine, TeraTemplate, TextEngine};

/// Errors raised by an engine implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A definition requested by a merge is not declared by the source artifact.
    #[error("definition `{definition}` is not declared in `{template}`")]
    MissingDefinition {
        definition: String,
        template: String,
    },

    /// Template text failed to compile.
    #[error("{message}")]
    Parse {
        message: String,
    },

    /// Execution of a compiled artifact failed.
    #[error("{message}")]
    Render {
        message: String,
    },

    /// The render data cannot be used as an engine context.
    #[error("render data must be a JSON object, got {found}")]
    InvalidData {
        found: &'static str,
    },

    /// The artifact was never parsed, or its root definition is empty.
    #[error("`{template}` is an incomplete or empty template")]
    Incomplete {
        template: String,
    },
}

/// Operations the resolver needs from a template engine.
///
/// Artifacts are values: [`Engine::clone_artifact`] must return a copy that
/// can be merged into and parsed into without affecting the original, because
/// cached artifacts are shared between every template built on them.
pub trait Engine: Send + Sync {
    /// Compiled template handle.
    type Artifact: Clone + Send + Sync + 'static;

    /// Create an empty artifact whose root definition is `name`.
    fn new_template(&self, name: &str, library: &FunctionLibrary) -> Self::Artifact;

    /// Produce an independent copy of `artifact`.
    fn clone_artifact(&self, artifact: &Self::Artifact) -> Self::Artifact;

    /// Splice the definition named `definition` from `src` into `dst`.
    fn merge_definition(
        &self,
        dst: &mut Self::Artifact,
        src: &Self::Artifact,
        definition: &str,
    ) -> Result<(), EngineError>;

    /// Parse `text` into `artifact`, returning the compiled result.
    fn parse_into(&self, artifact: Self::Artifact, text: &str)
    -> Result<Self::Artifact, EngineError>;

    /// Execute the artifact's root definition against `data`.
    fn execute(
        &self,
        artifact: &Self::Artifact,
        writer: &mut dyn Write,
        data: &Value,
    ) -> Result<(), EngineError>;

    /// Whether the artifact's root definition has no content.
    fn is_empty(&self, artifact: &Self::Artifact) -> bool;
}
