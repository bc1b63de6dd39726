//! Dependency graph model
//!
//! The resolved tree is stored as an arena: the graph owns every node and
//! hands out copyable [`NodeId`] indices; edges are ordered maps from a
//! local dependency key to a node index. Node identity is the manifest
//! path, so a package reached along two different chains is one node and
//! compiles exactly once.
//!
//! The graph is built once by the resolver and read-only afterward; the
//! compiler only produces derived text and side tables from it.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Index of a node in a [`DependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One resolved declaration package.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    /// Identity key: the manifest (or lone `.d.ts`) path this node was
    /// resolved from. Relative typings paths resolve against its parent
    /// directory.
    pub source_path: PathBuf,

    /// Ambient nodes declare global scope and merge unwrapped; everything
    /// else is wrapped in a module declaration and namespaced.
    pub ambient: bool,

    /// Resolution-failure placeholder. Referencing it aborts compilation;
    /// its paths are never read.
    pub missing: bool,

    /// Entry module inside the node's own sources; `<main>.d.ts` is the
    /// entry file when no typings path is given.
    pub main: Option<String>,

    /// Entry file for the default pass, relative to the base directory.
    pub typings: Option<String>,

    /// Entry file for the browser pass. Falls back to the default
    /// selection when unset.
    pub browser_typings: Option<String>,

    /// Direct-dependency key to replacement typings path, applied to that
    /// child during the browser pass only.
    pub browser_overrides: IndexMap<String, String>,

    /// Runtime dependencies, in manifest order.
    pub dependencies: IndexMap<String, NodeId>,

    /// Development dependencies, in manifest order.
    pub dev_dependencies: IndexMap<String, NodeId>,

    /// Ambient dependencies, in manifest order.
    pub ambient_dependencies: IndexMap<String, NodeId>,
}

impl DependencyNode {
    /// Create an empty node identified by `source_path`.
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            ambient: false,
            missing: false,
            main: None,
            typings: None,
            browser_typings: None,
            browser_overrides: IndexMap::new(),
            dependencies: IndexMap::new(),
            dev_dependencies: IndexMap::new(),
            ambient_dependencies: IndexMap::new(),
        }
    }

    /// Create a resolution-failure placeholder.
    pub fn missing(source_path: impl Into<PathBuf>) -> Self {
        Self {
            missing: true,
            ..Self::new(source_path)
        }
    }

    /// Directory the node's relative typings paths resolve against.
    pub fn base_dir(&self) -> &Path {
        self.source_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Look up a direct dependency by local key, checking runtime, then
    /// dev, then ambient tables.
    pub fn local_dependency(&self, key: &str) -> Option<NodeId> {
        self.dependencies
            .get(key)
            .or_else(|| self.dev_dependencies.get(key))
            .or_else(|| self.ambient_dependencies.get(key))
            .copied()
    }

    /// All outgoing edges in traversal order: runtime, dev, ambient, each
    /// in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.dependencies
            .iter()
            .chain(&self.dev_dependencies)
            .chain(&self.ambient_dependencies)
            .map(|(key, id)| (key.as_str(), *id))
    }
}

/// Arena of [`DependencyNode`]s keyed by `source_path`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    ids: HashMap<PathBuf, NodeId>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or return the existing id when a node with the same
    /// `source_path` is already present (diamond dependencies share one
    /// node).
    pub fn insert(&mut self, node: DependencyNode) -> NodeId {
        if let Some(&id) = self.ids.get(&node.source_path) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.ids.insert(node.source_path.clone(), id);
        self.nodes.push(node);
        id
    }

    /// Look up a node by its `source_path`.
    pub fn get(&self, source_path: &Path) -> Option<NodeId> {
        self.ids.get(source_path).copied()
    }

    /// Access a node.
    ///
    /// # Panics
    /// Panics when `id` does not come from this graph.
    pub fn node(&self, id: NodeId) -> &DependencyNode {
        &self.nodes[id.0]
    }

    /// Add a runtime dependency edge.
    pub fn add_dependency(&mut self, parent: NodeId, key: impl Into<String>, child: NodeId) {
        self.nodes[parent.0].dependencies.insert(key.into(), child);
    }

    /// Add a dev dependency edge.
    pub fn add_dev_dependency(&mut self, parent: NodeId, key: impl Into<String>, child: NodeId) {
        self.nodes[parent.0]
            .dev_dependencies
            .insert(key.into(), child);
    }

    /// Add an ambient dependency edge.
    pub fn add_ambient_dependency(
        &mut self,
        parent: NodeId,
        key: impl Into<String>,
        child: NodeId,
    ) {
        self.nodes[parent.0]
            .ambient_dependencies
            .insert(key.into(), child);
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedups_by_source_path() {
        let mut graph = DependencyGraph::new();
        let a = graph.insert(DependencyNode::new("/pkg/a/typack.json"));
        let b = graph.insert(DependencyNode::new("/pkg/b/typack.json"));
        let a_again = graph.insert(DependencyNode::new("/pkg/a/typack.json"));

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_edges_preserve_insertion_order() {
        let mut graph = DependencyGraph::new();
        let root = graph.insert(DependencyNode::new("/root/typack.json"));
        let x = graph.insert(DependencyNode::new("/x/typack.json"));
        let y = graph.insert(DependencyNode::new("/y/typack.json"));
        let z = graph.insert(DependencyNode::new("/z/typack.json"));

        graph.add_dependency(root, "zed", z);
        graph.add_dependency(root, "alpha", x);
        graph.add_ambient_dependency(root, "globals", y);

        let keys: Vec<&str> = graph.node(root).edges().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["zed", "alpha", "globals"]);
    }

    #[test]
    fn test_local_dependency_checks_all_tables() {
        let mut graph = DependencyGraph::new();
        let root = graph.insert(DependencyNode::new("/root/typack.json"));
        let dev = graph.insert(DependencyNode::new("/dev/typack.json"));
        let amb = graph.insert(DependencyNode::new("/amb/typack.json"));

        graph.add_dev_dependency(root, "dev-only", dev);
        graph.add_ambient_dependency(root, "globals", amb);

        let root_node = graph.node(root);
        assert_eq!(root_node.local_dependency("dev-only"), Some(dev));
        assert_eq!(root_node.local_dependency("globals"), Some(amb));
        assert_eq!(root_node.local_dependency("nope"), None);
    }

    #[test]
    fn test_base_dir() {
        let node = DependencyNode::new("/pkg/a/typack.json");
        assert_eq!(node.base_dir(), Path::new("/pkg/a"));
    }
}
