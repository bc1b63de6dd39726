//! Variant selection
//!
//! Decides, per node, which physical source file each compilation pass
//! loads. The default pass uses the node's typings path (or its main
//! entry with the declaration extension appended); the browser pass
//! prefers the browser typings path and otherwise falls back to the
//! default selection. A parent's browser override replaces the child's
//! own selection on that edge, for the browser pass only, and does not
//! propagate further. Like name allocation, the walk is deterministic and
//! first discovery wins.

use crate::source::{ensure_dts, normalize};
use crate::tree::{DependencyGraph, DependencyNode, NodeId};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// One of the two independent compilation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// The default emission.
    Default,
    /// The browser-specific emission.
    Browser,
}

/// Entry file chosen for each node in one pass. Nodes with no entry (no
/// typings, no main) and missing placeholders are absent.
#[derive(Debug, Default)]
pub struct EntryTable {
    entries: HashMap<NodeId, PathBuf>,
}

impl EntryTable {
    /// The entry file selected for a node, if it has one.
    pub fn entry(&self, id: NodeId) -> Option<&PathBuf> {
        self.entries.get(&id)
    }
}

/// Choose the entry file for every node reachable from `root`.
pub fn select(graph: &DependencyGraph, root: NodeId, variant: Variant) -> EntryTable {
    let mut table = EntryTable::default();
    let mut seen = HashSet::new();
    visit(graph, &mut table, &mut seen, root, variant, None);
    table
}

fn visit(
    graph: &DependencyGraph,
    table: &mut EntryTable,
    seen: &mut HashSet<NodeId>,
    id: NodeId,
    variant: Variant,
    override_path: Option<PathBuf>,
) {
    if !seen.insert(id) {
        return;
    }

    let node = graph.node(id);
    if !node.missing {
        let entry = override_path.or_else(|| own_selection(node, variant));
        if let Some(entry) = entry {
            table.entries.insert(id, normalize(&entry));
        }
    }

    for (key, child) in node.edges() {
        let overridden = match variant {
            Variant::Browser => node
                .browser_overrides
                .get(key)
                .map(|path| node.base_dir().join(ensure_dts(path))),
            Variant::Default => None,
        };
        visit(graph, table, seen, child, variant, overridden);
    }
}

fn own_selection(node: &DependencyNode, variant: Variant) -> Option<PathBuf> {
    let base = node.base_dir();
    let default = node
        .typings
        .as_deref()
        .or(node.main.as_deref())
        .map(|path| base.join(ensure_dts(path)));

    match variant {
        Variant::Default => default,
        Variant::Browser => node
            .browser_typings
            .as_deref()
            .map(|path| base.join(ensure_dts(path)))
            .or(default),
    }
}
