//! Tera-backed engines.
//!
//! A [`TeraTemplate`] is a set of named definitions compiled together into one
//! Tera instance, plus the name of the root definition that execution starts
//! from. On top of plain Tera syntax the adapter understands two actions:
//!
//! - `{{ define "NAME" }}...{{ end }}` declares the definition `NAME`
//! - `{{ template "NAME" . }}` invokes a definition, lowered to
//!   `{% include "NAME" %}` so the current context flows into it
//!
//! Text outside any `define` block becomes the root definition. When a root
//! definition already exists (the artifact is a clone of a layout) and the new
//! body is blank, the existing root survives, which is how content templates
//! fill a layout without replacing it.

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, LazyLock};
use tera::{Context, Tera};

use super::{Engine, EngineError};
use crate::templating::filters::FunctionLibrary;

static DEFINE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{\{\s*define\s+"([^"]+)"\s*\}\}(.*?)\{\{\s*end\s*\}\}"#)
        .expect("define pattern is a valid regex")
});

static TEMPLATE_ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*template\s+"([^"]+)"[^}]*\}\}"#)
        .expect("template action pattern is a valid regex")
});

static TERA_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{#.*?#\}").expect("comment pattern is a valid regex"));

/// Compiled artifact shared by [`TextEngine`] and [`HtmlEngine`].
#[derive(Clone)]
pub struct TeraTemplate {
    name: String,
    definitions: BTreeMap<String, String>,
    library: FunctionLibrary,
    compiled: Option<Arc<Tera>>,
}

impl fmt::Debug for TeraTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeraTemplate")
            .field("name", &self.name)
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("compiled", &self.compiled.is_some())
            .finish()
    }
}

impl TeraTemplate {
    fn new(name: &str, library: &FunctionLibrary) -> Self {
        Self {
            name: name.to_string(),
            definitions: BTreeMap::new(),
            library: library.clone(),
            compiled: None,
        }
    }

    /// Name of the definition execution starts from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of every definition in this artifact, sorted.
    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Lowered Tera source of a definition.
    pub fn definition(&self, name: &str) -> Option<&str> {
        self.definitions.get(name).map(String::as_str)
    }

    /// Whether the definitions have been compiled since the last change.
    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escaping {
    Off,
    Html,
}

/// Engine that writes interpolated values verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEngine;

/// Engine that HTML-escapes every interpolated value.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEngine;

impl Engine for TextEngine {
    type Artifact = TeraTemplate;

    fn new_template(&self, name: &str, library: &FunctionLibrary) -> TeraTemplate {
        TeraTemplate::new(name, library)
    }

    fn clone_artifact(&self, artifact: &TeraTemplate) -> TeraTemplate {
        artifact.clone()
    }

    fn merge_definition(
        &self,
        dst: &mut TeraTemplate,
        src: &TeraTemplate,
        definition: &str,
    ) -> Result<(), EngineError> {
        merge_definition(dst, src, definition)
    }

    fn parse_into(&self, artifact: TeraTemplate, text: &str) -> Result<TeraTemplate, EngineError> {
        parse_into(Escaping::Off, artifact, text)
    }

    fn execute(
        &self,
        artifact: &TeraTemplate,
        writer: &mut dyn Write,
        data: &Value,
    ) -> Result<(), EngineError> {
        execute(artifact, writer, data)
    }

    fn is_empty(&self, artifact: &TeraTemplate) -> bool {
        root_is_empty(artifact)
    }
}

impl Engine for HtmlEngine {
    type Artifact = TeraTemplate;

    fn new_template(&self, name: &str, library: &FunctionLibrary) -> TeraTemplate {
        TeraTemplate::new(name, library)
    }

    fn clone_artifact(&self, artifact: &TeraTemplate) -> TeraTemplate {
        artifact.clone()
    }

    fn merge_definition(
        &self,
        dst: &mut TeraTemplate,
        src: &TeraTemplate,
        definition: &str,
    ) -> Result<(), EngineError> {
        merge_definition(dst, src, definition)
    }

    fn parse_into(&self, artifact: TeraTemplate, text: &str) -> Result<TeraTemplate, EngineError> {
        parse_into(Escaping::Html, artifact, text)
    }

    fn execute(
        &self,
        artifact: &TeraTemplate,
        writer: &mut dyn Write,
        data: &Value,
    ) -> Result<(), EngineError> {
        execute(artifact, writer, data)
    }

    fn is_empty(&self, artifact: &TeraTemplate) -> bool {
        root_is_empty(artifact)
    }
}

/// Copy `definition` from `src`, along with any other non-root definitions
/// `dst` does not have yet, so nested includes travel with their includer.
fn merge_definition(
    dst: &mut TeraTemplate,
    src: &TeraTemplate,
    definition: &str,
) -> Result<(), EngineError> {
    let body = src.definitions.get(definition).ok_or_else(|| EngineError::MissingDefinition {
        definition: definition.to_string(),
        template: src.name.clone(),
    })?;
    dst.definitions.insert(definition.to_string(), body.clone());

    for (name, body) in &src.definitions {
        if name != &src.name && !dst.definitions.contains_key(name) {
            dst.definitions.insert(name.clone(), body.clone());
        }
    }
    dst.compiled = None;
    Ok(())
}

fn parse_into(
    escaping: Escaping,
    mut artifact: TeraTemplate,
    text: &str,
) -> Result<TeraTemplate, EngineError> {
    let (body, definitions) = lower(text);
    for (name, source) in definitions {
        artifact.definitions.insert(name, source);
    }
    if !is_blank(&body) || !artifact.definitions.contains_key(&artifact.name) {
        artifact.definitions.insert(artifact.name.clone(), body);
    }

    let mut tera = Tera::default();
    match escaping {
        Escaping::Off => tera.autoescape_on(vec![]),
        // Every name ends with the empty suffix.
        Escaping::Html => tera.autoescape_on(vec![""]),
    }
    artifact.library.install(&mut tera);
    tera.add_raw_templates(artifact.definitions.iter()).map_err(|e| EngineError::Parse {
        message: describe_tera_error(&e),
    })?;

    tracing::trace!(
        template = %artifact.name,
        definitions = artifact.definitions.len(),
        "compiled tera definitions"
    );
    artifact.compiled = Some(Arc::new(tera));
    Ok(artifact)
}

fn execute(artifact: &TeraTemplate, writer: &mut dyn Write, data: &Value) -> Result<(), EngineError> {
    let compiled = artifact.compiled.as_ref().ok_or_else(|| EngineError::Incomplete {
        template: artifact.name.clone(),
    })?;

    let context = match data {
        Value::Null => Context::new(),
        Value::Object(_) => Context::from_value(data.clone()).map_err(|e| EngineError::Render {
            message: describe_tera_error(&e),
        })?,
        other => {
            return Err(EngineError::InvalidData {
                found: json_kind(other),
            });
        }
    };

    compiled.render_to(&artifact.name, &context, writer).map_err(|e| EngineError::Render {
        message: describe_tera_error(&e),
    })
}

fn root_is_empty(artifact: &TeraTemplate) -> bool {
    artifact.definitions.get(&artifact.name).is_none_or(|body| is_blank(body))
}

/// Split `text` into its top-level body and its `define` blocks, lowering
/// `template` actions to Tera includes in both.
fn lower(text: &str) -> (String, Vec<(String, String)>) {
    let mut definitions = Vec::new();
    let body = DEFINE_BLOCK.replace_all(text, |caps: &Captures<'_>| {
        definitions.push((caps[1].to_string(), lower_actions(&caps[2])));
        String::new()
    });
    (lower_actions(&body), definitions)
}

fn lower_actions(text: &str) -> String {
    TEMPLATE_ACTION.replace_all(text, r#"{% include "${1}" %}"#).into_owned()
}

/// Whitespace and Tera comments only.
fn is_blank(body: &str) -> bool {
    TERA_COMMENT.replace_all(body, "").trim().is_empty()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Flatten a Tera error and its sources into one message.
///
/// Tera reports only a headline such as "Failed to parse 'x'" from `Display`;
/// the useful location and expectation live further down the source chain.
pub(crate) fn describe_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        let message = err.to_string().trim().to_string();
        if !message.is_empty() && messages.last() != Some(&message) {
            messages.push(message);
        }
        current = err.source();
    }
    messages.join(": ")
}
