//! Tree display command
//!
//! Renders a resolved dependency tree, one node per line, flagging
//! ambient packages and missing placeholders.

use typack_core::{DependencyGraph, NodeId};

/// Render the tree rooted at `root` under the given display name.
pub fn render_tree(graph: &DependencyGraph, root: NodeId, name: &str) -> String {
    let mut out = String::new();
    out.push_str(name);
    out.push('\n');
    render_children(graph, root, "", &mut out);
    out
}

fn render_children(graph: &DependencyGraph, id: NodeId, indent: &str, out: &mut String) {
    let node = graph.node(id);
    let edges: Vec<(&str, NodeId)> = node.edges().collect();

    for (i, (key, child)) in edges.iter().enumerate() {
        let last = i + 1 == edges.len();
        let child_node = graph.node(*child);

        out.push_str(indent);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(key);
        if child_node.ambient {
            out.push_str(" (ambient)");
        }
        if child_node.missing {
            out.push_str(" (missing)");
        }
        out.push('\n');

        let next = format!("{indent}{}", if last { "    " } else { "│   " });
        render_children(graph, *child, &next, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typack_core::DependencyNode;

    #[test]
    fn test_render_tree() {
        let mut graph = DependencyGraph::new();
        let root = graph.insert(DependencyNode::new("/app/typack.json"));
        let a = graph.insert(DependencyNode::new("/app/a/typack.json"));
        let nested = graph.insert(DependencyNode::new("/app/a/n/typack.json"));
        let gone = graph.insert(DependencyNode::missing("npm:gone"));

        graph.add_dependency(root, "a", a);
        graph.add_dependency(root, "gone", gone);
        graph.add_dependency(a, "nested", nested);

        let rendered = render_tree(&graph, root, "app");
        assert_eq!(
            rendered,
            "app\n\
             ├── a\n\
             │   └── nested\n\
             └── gone (missing)\n"
        );
    }
}
