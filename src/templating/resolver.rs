//! Recursive directive resolution.
//!
//! [`Resolver::preprocess`] turns one template name into a compiled, cached
//! node. For every directive in the source it first resolves the referenced
//! template (reusing cached nodes), then builds the template's own artifact:
//!
//! 1. base artifact: a clone of the layout's artifact when the source has a
//!    `layout` directive, otherwise a fresh artifact
//! 2. each included artifact is merged in by its reference, in scan order
//! 3. the source text, minus its `layout` directive, is parsed into the base
//!
//! Included definitions are looked up by the raw reference, marker included,
//! so `@b` and `@./b` load the same template once but each spelling needs its
//! own `define` in it.
//!
//! The finished node is committed to the cache as a parent of everything it
//! referenced. A failure anywhere aborts the whole call; nodes completed by
//! earlier sibling branches stay cached.

use std::collections::HashSet;
use std::sync::Arc;

use super::cache::{CompiledNode, TemplateCache};
use super::engine::Engine;
use super::error::ComposeError;
use super::filters::FunctionLibrary;
use super::reader::TemplateReader;
use super::scanner::{Directive, DirectiveKind, DirectiveScanner};
use crate::utils::paths::normalize_name;

type Node<E> = Arc<CompiledNode<<E as Engine>::Artifact>>;

/// Templates currently being resolved on the active call stack.
///
/// One context is created per top-level call and is never shared between
/// threads.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    /// Names entered and not yet left.
    active: HashSet<String>,
    /// The same names in the order they were entered.
    path: Vec<String>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as in flight. Returns `false` if it already is.
    pub fn enter(&mut self, name: &str) -> bool {
        if !self.active.insert(name.to_string()) {
            return false;
        }
        self.path.push(name.to_string());
        true
    }

    /// Mark `name` as finished.
    pub fn leave(&mut self, name: &str) {
        if self.active.remove(name) {
            if let Some(index) = self.path.iter().rposition(|entry| entry == name) {
                self.path.remove(index);
            }
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// In-flight names, outermost first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Borrowed view of everything one resolution needs.
pub struct Resolver<'a, E: Engine> {
    engine: &'a E,
    reader: &'a dyn TemplateReader,
    /// Consulted for every reference and committed to after every build.
    cache: &'a dyn TemplateCache<E::Artifact>,
    /// Registered on every fresh artifact.
    library: &'a FunctionLibrary,
    scanner: DirectiveScanner,
}

impl<'a, E: Engine> Resolver<'a, E> {
    pub fn new(
        engine: &'a E,
        reader: &'a dyn TemplateReader,
        cache: &'a dyn TemplateCache<E::Artifact>,
        library: &'a FunctionLibrary,
    ) -> Self {
        Self {
            engine,
            reader,
            cache,
            library,
            scanner: DirectiveScanner::new(),
        }
    }

    /// Return the cached node for `name`, resolving it on a miss.
    pub fn resolve(&self, name: &str) -> Result<Node<E>, ComposeError> {
        let name = normalize_name(name);
        if let Some(node) = self.cache.get(&name) {
            tracing::trace!(template = %name, "cache hit");
            return Ok(node);
        }
        tracing::debug!(template = %name, "cache miss; resolving");
        self.preprocess(&name, &mut ResolutionContext::new())
    }

    /// Resolve `name` from source, ignoring any cached node for it.
    ///
    /// `name` must already be normalized.
    pub fn preprocess(&self, name: &str, ctx: &mut ResolutionContext) -> Result<Node<E>, ComposeError> {
        if !ctx.enter(name) {
            tracing::debug!(template = %name, path = ?ctx.path(), "composition cycle detected");
            return Err(ComposeError::Recursive {
                name: name.to_string(),
            });
        }
        let result = self.build(name, ctx);
        ctx.leave(name);
        result
    }

    fn build(&self, name: &str, ctx: &mut ResolutionContext) -> Result<Node<E>, ComposeError> {
        let bytes = self.reader.read(name)?;
        let mut text = String::from_utf8(bytes).map_err(|source| ComposeError::Encoding {
            name: name.to_string(),
            source,
        })?;

        // Checked up front so a second layout is reported even when the
        // first one cannot be resolved.
        let layouts = self.scanner.scan(&text).filter(|d| d.kind == DirectiveKind::Layout).count();
        if layouts > 1 {
            return Err(ComposeError::DuplicateLayout {
                name: name.to_string(),
            });
        }

        let mut layout: Option<Node<E>> = None;
        let mut includes: Vec<(String, Node<E>)> = Vec::new();
        let mut dependencies: Vec<Node<E>> = Vec::new();
        let mut cursor = 0;

        while let Some(directive) = self.scanner.find_at(&text, cursor) {
            tracing::trace!(
                template = %name,
                kind = %directive.kind,
                reference = %directive.reference,
                "found directive"
            );
            match directive.kind {
                DirectiveKind::Layout => {
                    if layout.is_some() {
                        return Err(ComposeError::DuplicateLayout {
                            name: name.to_string(),
                        });
                    }
                    let node = self.dependency(name, &directive, &dependencies, ctx)?;
                    // Offsets past the span are stale now; rescan from its start.
                    text.replace_range(directive.span.clone(), "");
                    cursor = directive.span.start;
                    push_unique(&mut dependencies, &node);
                    layout = Some(node);
                }
                DirectiveKind::Include => {
                    cursor = directive.span.end;
                    if includes.iter().any(|(reference, _)| reference == &directive.reference) {
                        continue;
                    }
                    let node = self.dependency(name, &directive, &dependencies, ctx)?;
                    push_unique(&mut dependencies, &node);
                    includes.push((directive.reference, node));
                }
            }
        }

        let mut artifact = match &layout {
            Some(node) => self.engine.clone_artifact(node.artifact()),
            None => self.engine.new_template(name, self.library),
        };
        for (reference, node) in &includes {
            self.engine.merge_definition(&mut artifact, node.artifact(), reference).map_err(
                |source| ComposeError::Merge {
                    definition: reference.clone(),
                    template: node.name().to_string(),
                    source,
                },
            )?;
        }
        let artifact = self.engine.parse_into(artifact, &text).map_err(|source| ComposeError::Parse {
            name: name.to_string(),
            source,
        })?;

        let node = Arc::new(CompiledNode::new(name, artifact).with_dependencies(dependencies));
        if self.cache.put(Arc::clone(&node)) {
            tracing::debug!(template = %name, dependencies = ?node.dependency_names(), "committed template");
        }
        Ok(node)
    }

    /// Resolve the template a directive in `parent` refers to.
    ///
    /// A template `parent` already resolved under another spelling is
    /// reused as is.
    fn dependency(
        &self,
        parent: &str,
        directive: &Directive,
        resolved: &[Node<E>],
        ctx: &mut ResolutionContext,
    ) -> Result<Node<E>, ComposeError> {
        if let Some(node) = resolved.iter().find(|node| node.name() == directive.name) {
            return Ok(Arc::clone(node));
        }
        if !ctx.is_active(&directive.name) {
            if let Some(node) = self.cache.get(&directive.name) {
                tracing::trace!(template = %directive.name, parent = %parent, "cache hit");
                return Ok(node);
            }
        }
        self.preprocess(&directive.name, ctx).map_err(|source| ComposeError::Directive {
            kind: directive.kind,
            reference: directive.reference.clone(),
            parent: parent.to_string(),
            source: Box::new(source),
        })
    }
}

fn push_unique<T>(nodes: &mut Vec<Arc<CompiledNode<T>>>, node: &Arc<CompiledNode<T>>) {
    if !nodes.iter().any(|existing| existing.name() == node.name()) {
        nodes.push(Arc::clone(node));
    }
}
