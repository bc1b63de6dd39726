//! Canonical name allocation
//!
//! Walks the dependency graph once and assigns every reachable
//! non-ambient node its canonical module identifier (the name its wrapper
//! block declares in the merged output) and an internal namespace prefix
//! for the node's own sub-modules. Allocation is deterministic: children
//! are visited runtime, dev, then ambient dependencies, each in insertion
//! order, and a node reached again along another chain keeps the names
//! from its first discovery.

use crate::tree::{DependencyGraph, NodeId};
use std::collections::{HashMap, HashSet};

/// Side table produced by [`allocate`].
#[derive(Debug, Default)]
pub struct NameTable {
    modules: HashMap<NodeId, String>,
    prefixes: HashMap<NodeId, String>,
    self_names: HashMap<NodeId, String>,
}

impl NameTable {
    /// Canonical module identifier of a node. `None` for ambient nodes,
    /// which merge without a name.
    pub fn module_id(&self, id: NodeId) -> Option<&str> {
        self.modules.get(&id).map(String::as_str)
    }

    /// Internal namespace prefix for a node's own sub-modules
    /// (canonical identifier plus a trailing slash).
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.prefixes.get(&id).map(String::as_str)
    }

    /// The local key a node was first reached under (the root alias for
    /// the root). This is the name the node's own text refers to itself
    /// by.
    pub fn self_name(&self, id: NodeId) -> Option<&str> {
        self.self_names.get(&id).map(String::as_str)
    }
}

/// Assign canonical names to every node reachable from `root`.
///
/// The root gets the caller's alias; a node reached from a parent with
/// prefix `P` under key `k` gets `P` (without its trailing slash) + `!` +
/// `k`. Children of a prefix-less (ambient) parent get their bare key.
pub fn allocate(
    graph: &DependencyGraph,
    root: NodeId,
    alias: &str,
    root_ambient: bool,
) -> NameTable {
    let mut table = NameTable::default();
    let mut seen = HashSet::new();

    let root_names = if root_ambient {
        None
    } else {
        Some((alias.to_string(), format!("{alias}/")))
    };
    visit(graph, &mut table, &mut seen, root, alias, root_names);

    table
}

fn visit(
    graph: &DependencyGraph,
    table: &mut NameTable,
    seen: &mut HashSet<NodeId>,
    id: NodeId,
    self_name: &str,
    names: Option<(String, String)>,
) {
    if !seen.insert(id) {
        return;
    }

    table.self_names.insert(id, self_name.to_string());

    let prefix = match names {
        Some((module, prefix)) => {
            table.modules.insert(id, module);
            table.prefixes.insert(id, prefix.clone());
            prefix
        }
        None => String::new(),
    };

    let node = graph.node(id);
    for (key, child) in node.edges() {
        let child_names = if graph.node(child).ambient {
            None
        } else {
            Some(compose(&prefix, key))
        };
        visit(graph, table, seen, child, key, child_names);
    }
}

/// Canonical identifier and prefix for a child reached under `key` from a
/// parent with namespace `parent_prefix`.
fn compose(parent_prefix: &str, key: &str) -> (String, String) {
    let module = if parent_prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}!{}", parent_prefix.trim_end_matches('/'), key)
    };
    let prefix = format!("{module}/");
    (module, prefix)
}
