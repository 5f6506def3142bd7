//! Compiled template cache with dependency-aware invalidation.
//!
//! Every cached [`CompiledNode`] records which nodes it was built from
//! (children) and which nodes were built from it (parents). A parent embeds a
//! compiled copy of each child, so evicting a node must evict every parent,
//! transitively; [`TemplateCache::invalidate`] walks that graph upwards.
//!
//! Two implementations are available and chosen at construction through
//! [`CacheMode`]:
//!
//! - [`DependencyCache`]: the real cache; a single `RwLock` guards the node
//!   graph, so every operation (including a whole invalidation cascade) is
//!   atomic to other threads
//! - [`NopCache`]: never stores anything, so every render resolves from scratch
//!
//! # Edges
//!
//! [`DependencyCache`] keeps one `petgraph` edge per dependency, pointing from
//! the node to the node it was built from. `children(a)` are the targets of
//! `a`'s outgoing edges and `parents(a)` the sources of its incoming ones, so
//! `b ∈ parents(a)` exactly when `a ∈ children(b)`.
//!
//! # Stale commits
//!
//! A node holds the exact [`Arc`]s of the dependencies it embeds. `put` only
//! accepts it when each of those is still the node cached under its name; a
//! dependency that was evicted or replaced while the node was being built
//! would otherwise leave a stale copy behind that no later eviction reaches.

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A compiled template, the name it was resolved under and the templates it
/// was built from.
#[derive(Debug)]
pub struct CompiledNode<T> {
    /// Normalized template name; the cache key.
    name: String,
    /// Engine output for this template, with every dependency merged in.
    artifact: T,
    /// Nodes whose artifacts were merged into `artifact`, in scan order.
    dependencies: Vec<Arc<CompiledNode<T>>>,
}

impl<T> CompiledNode<T> {
    pub fn new(name: impl Into<String>, artifact: T) -> Self {
        Self {
            name: name.into(),
            artifact,
            dependencies: Vec::new(),
        }
    }

    /// Record the nodes this node's artifact embeds, in scan order.
    pub fn with_dependencies(mut self, dependencies: Vec<Arc<CompiledNode<T>>>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact(&self) -> &T {
        &self.artifact
    }

    /// Direct dependencies: every included template and the layout, if any.
    pub fn dependencies(&self) -> &[Arc<CompiledNode<T>>] {
        &self.dependencies
    }

    /// Names of [`dependencies`](Self::dependencies), in the same order.
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.iter().map(|dependency| dependency.name.clone()).collect()
    }
}

/// Whether compiled templates are kept between renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Keep compiled templates until they are evicted.
    Enabled,
    /// Resolve every template from its source on every render.
    #[default]
    Disabled,
}

impl CacheMode {
    /// Build the cache implementation this mode selects.
    pub fn build<T: Send + Sync + 'static>(self) -> Arc<dyn TemplateCache<T>> {
        match self {
            Self::Enabled => Arc::new(DependencyCache::new()),
            Self::Disabled => Arc::new(NopCache),
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// Storage for compiled templates, shared by concurrent renders.
pub trait TemplateCache<T>: Send + Sync {
    /// Look up a node without triggering resolution.
    fn get(&self, name: &str) -> Option<Arc<CompiledNode<T>>>;

    /// Insert or replace `node`, recording it as a parent of each of its
    /// dependencies. A replaced node keeps its parents.
    ///
    /// Returns `false` when the node was not stored.
    fn put(&self, node: Arc<CompiledNode<T>>) -> bool;

    /// Evict `name` and, transitively, everything built on it.
    ///
    /// Returns the evicted names in eviction order, `name` first. An absent
    /// name evicts nothing.
    fn invalidate(&self, name: &str) -> Vec<String>;

    /// Evict everything.
    fn clear(&self);

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of cached nodes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached names, sorted.
    fn names(&self) -> Vec<String>;

    /// Names of cached nodes built on `name`.
    fn parents(&self, name: &str) -> BTreeSet<String>;

    /// Names of cached nodes `name` was built from.
    fn children(&self, name: &str) -> BTreeSet<String>;
}

/// Cached nodes and the edges between them.
struct CacheGraph<T> {
    /// Edges point from a node to each node it was built from.
    graph: StableDiGraph<Arc<CompiledNode<T>>, ()>,
    /// Graph index of every cached name.
    node_map: HashMap<String, NodeIndex>,
}

impl<T> CacheGraph<T> {
    fn node(&self, name: &str) -> Option<&Arc<CompiledNode<T>>> {
        self.node_map.get(name).map(|&index| &self.graph[index])
    }

    fn neighbors(&self, name: &str, direction: Direction) -> BTreeSet<String> {
        let Some(&index) = self.node_map.get(name) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(index, direction)
            .map(|neighbor| self.graph[neighbor].name().to_string())
            .collect()
    }

    /// First dependency of `node` that is not the node currently cached
    /// under its name.
    fn stale_dependency<'n>(&self, node: &'n CompiledNode<T>) -> Option<&'n str> {
        node.dependencies()
            .iter()
            .find(|dependency| {
                self.node(dependency.name()).is_none_or(|cached| !Arc::ptr_eq(cached, dependency))
            })
            .map(|dependency| dependency.name())
    }
}

/// Cache that tracks structural dependencies between compiled templates.
pub struct DependencyCache<T> {
    inner: RwLock<CacheGraph<T>>,
}

impl<T> Default for DependencyCache<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(CacheGraph {
                graph: StableDiGraph::default(),
                node_map: HashMap::new(),
            }),
        }
    }
}

impl<T> fmt::Debug for DependencyCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        let mut names: Vec<&String> = inner.node_map.keys().collect();
        names.sort();
        f.debug_struct("DependencyCache").field("names", &names).finish()
    }
}

impl<T> DependencyCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation leaves the graph consistent before releasing the lock,
    // so recovering the guard from a poisoned lock is sound.
    fn read(&self) -> RwLockReadGuard<'_, CacheGraph<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheGraph<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + Sync> TemplateCache<T> for DependencyCache<T> {
    fn get(&self, name: &str) -> Option<Arc<CompiledNode<T>>> {
        self.read().node(name).cloned()
    }

    fn put(&self, node: Arc<CompiledNode<T>>) -> bool {
        let mut guard = self.write();
        let inner = &mut *guard;

        if let Some(stale) = inner.stale_dependency(&node) {
            tracing::debug!(
                template = %node.name(),
                dependency = %stale,
                "dependency changed during resolution; not caching"
            );
            return false;
        }

        let index = match inner.node_map.get(node.name()) {
            Some(&index) => {
                let outgoing: Vec<_> =
                    inner.graph.edges_directed(index, Direction::Outgoing).map(|edge| edge.id()).collect();
                for edge in outgoing {
                    inner.graph.remove_edge(edge);
                }
                inner.graph[index] = Arc::clone(&node);
                index
            }
            None => {
                let index = inner.graph.add_node(Arc::clone(&node));
                inner.node_map.insert(node.name().to_string(), index);
                index
            }
        };

        for dependency in node.dependencies() {
            if let Some(&child) = inner.node_map.get(dependency.name()) {
                inner.graph.update_edge(index, child, ());
            }
        }

        tracing::trace!(
            template = %node.name(),
            children = node.dependencies().len(),
            "cached compiled template"
        );
        true
    }

    fn invalidate(&self, name: &str) -> Vec<String> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let Some(&start) = inner.node_map.get(name) else {
            return Vec::new();
        };

        let mut evicted = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![start];

        while let Some(index) = pending.pop() {
            if !visited.insert(index) {
                continue;
            }
            pending.extend(inner.graph.neighbors_directed(index, Direction::Incoming));
            if let Some(node) = inner.graph.remove_node(index) {
                inner.node_map.remove(node.name());
                evicted.push(node.name().to_string());
            }
        }

        tracing::debug!(template = %name, evicted = ?evicted, "invalidated cached templates");
        evicted
    }

    fn clear(&self) {
        let mut inner = self.write();
        inner.graph.clear();
        inner.node_map.clear();
    }

    fn len(&self) -> usize {
        self.read().node_map.len()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().node_map.keys().cloned().collect();
        names.sort();
        names
    }

    fn parents(&self, name: &str) -> BTreeSet<String> {
        self.read().neighbors(name, Direction::Incoming)
    }

    fn children(&self, name: &str) -> BTreeSet<String> {
        self.read().neighbors(name, Direction::Outgoing)
    }
}

/// Cache that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopCache;

impl<T> TemplateCache<T> for NopCache {
    fn get(&self, _name: &str) -> Option<Arc<CompiledNode<T>>> {
        None
    }

    fn put(&self, _node: Arc<CompiledNode<T>>) -> bool {
        false
    }

    fn invalidate(&self, _name: &str) -> Vec<String> {
        Vec::new()
    }

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }

    fn names(&self) -> Vec<String> {
        Vec::new()
    }

    fn parents(&self, _name: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn children(&self, _name: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }
}
