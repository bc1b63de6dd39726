//! Dependency tree construction
//!
//! Builds the compiler's dependency graph from typack.json manifests on
//! disk. Only `file:` locations resolve here; anything that would need a
//! network fetch becomes a `missing` placeholder node, and compiling a
//! reference to one fails fast. Paths are canonicalized before insertion
//! so a package reached along two chains lands on one node.

use crate::manifest::{BrowserField, Location, Manifest, ManifestError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use typack_core::{DependencyGraph, DependencyNode, NodeId};

/// Errors that can occur while building the tree
#[derive(Debug, Error)]
pub enum TreeError {
    /// A manifest failed to load or validate
    #[error("failed to load {}: {source}", .path.display())]
    ManifestError {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// A chain of `file:` locations reached itself
    #[error("circular dependency: {0}")]
    CircularDependency(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Tree construction options
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOptions {
    /// Skip the root manifest's devDependencies
    pub production: bool,
}

/// A resolved tree ready for compilation
#[derive(Debug)]
pub struct ResolvedTree {
    /// The node arena
    pub graph: DependencyGraph,

    /// The root node
    pub root: NodeId,

    /// The root manifest's package name
    pub name: String,
}

/// Build the dependency graph rooted at `manifest_path`.
///
/// devDependencies are honored for the root manifest only; transitive
/// dev dependencies never take part in compilation.
pub fn build_tree(manifest_path: &Path, options: &TreeOptions) -> Result<ResolvedTree, TreeError> {
    let manifest_path = manifest_path.canonicalize()?;
    let manifest = Manifest::from_file(&manifest_path).map_err(|source| TreeError::ManifestError {
        path: manifest_path.clone(),
        source,
    })?;
    let name = manifest.name.clone();

    let mut builder = Builder {
        graph: DependencyGraph::new(),
        stack: Vec::new(),
        options: *options,
    };
    let root = builder.resolve_parsed(manifest, &manifest_path, true)?;

    tracing::debug!(name = %name, nodes = builder.graph.len(), "resolved dependency tree");

    Ok(ResolvedTree {
        graph: builder.graph,
        root,
        name,
    })
}

struct Builder {
    graph: DependencyGraph,
    stack: Vec<PathBuf>,
    options: TreeOptions,
}

impl Builder {
    fn resolve_manifest(&mut self, path: &Path, is_root: bool) -> Result<NodeId, TreeError> {
        if self.stack.iter().any(|entry| entry == path) {
            let mut cycle: Vec<String> = self
                .stack
                .iter()
                .map(|entry| entry.display().to_string())
                .collect();
            cycle.push(path.display().to_string());
            return Err(TreeError::CircularDependency(cycle.join(" -> ")));
        }

        if let Some(id) = self.graph.get(path) {
            return Ok(id);
        }

        let manifest = Manifest::from_file(path).map_err(|source| TreeError::ManifestError {
            path: path.to_path_buf(),
            source,
        })?;
        self.resolve_parsed(manifest, path, is_root)
    }

    fn resolve_parsed(
        &mut self,
        manifest: Manifest,
        path: &Path,
        is_root: bool,
    ) -> Result<NodeId, TreeError> {
        let mut node = DependencyNode::new(path);
        node.ambient = manifest.ambient;
        node.main = manifest.main;
        node.typings = manifest.typings;
        match manifest.browser {
            Some(BrowserField::Path(browser)) => node.browser_typings = Some(browser),
            Some(BrowserField::Overrides(overrides)) => node.browser_overrides = overrides,
            None => {}
        }

        let id = self.graph.insert(node);
        self.stack.push(path.to_path_buf());

        for (key, location) in &manifest.dependencies {
            let child = self.resolve_location(path, location)?;
            self.graph.add_dependency(id, key.clone(), child);
        }
        if is_root && !self.options.production {
            for (key, location) in &manifest.dev_dependencies {
                let child = self.resolve_location(path, location)?;
                self.graph.add_dev_dependency(id, key.clone(), child);
            }
        }
        for (key, location) in &manifest.ambient_dependencies {
            let child = self.resolve_location(path, location)?;
            self.graph.add_ambient_dependency(id, key.clone(), child);
        }

        self.stack.pop();
        Ok(id)
    }

    fn resolve_location(&mut self, parent: &Path, raw: &str) -> Result<NodeId, TreeError> {
        match Location::parse(raw) {
            Location::File(relative) => {
                let parent_dir = parent.parent().unwrap_or_else(|| Path::new(""));
                let joined = parent_dir.join(&relative);
                let target = match joined.canonicalize() {
                    Ok(target) => target,
                    Err(_) => {
                        tracing::warn!(
                            location = raw,
                            "location does not resolve; marking missing"
                        );
                        return Ok(self.graph.insert(DependencyNode::missing(joined)));
                    }
                };

                // A directory location means its manifest.
                let target = if target.is_dir() {
                    target.join("typack.json")
                } else {
                    target
                };
                if !target.exists() {
                    tracing::warn!(location = raw, "location has no manifest; marking missing");
                    return Ok(self.graph.insert(DependencyNode::missing(target)));
                }

                if is_declaration_file(&target) {
                    // A lone .d.ts is a leaf package whose typings are the
                    // file itself.
                    let typings = target
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned());
                    let mut node = DependencyNode::new(&target);
                    node.typings = typings;
                    Ok(self.graph.insert(node))
                } else {
                    self.resolve_manifest(&target, false)
                }
            }
            Location::Unsupported(location) => {
                tracing::warn!(
                    location = %location,
                    "unsupported location scheme; marking missing"
                );
                Ok(self.graph.insert(DependencyNode::missing(location)))
            }
        }
    }
}

fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".d.ts"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_build_simple_tree() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "main": "index", "dependencies": { "a": "file:a/typack.json" } }"#,
        );
        write(
            &dir.path().join("a/typack.json"),
            r#"{ "name": "a", "typings": "index.d.ts" }"#,
        );

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();

        assert_eq!(tree.name, "app");
        assert_eq!(tree.graph.len(), 2);

        let root = tree.graph.node(tree.root);
        assert_eq!(root.main.as_deref(), Some("index"));
        let a = tree.graph.node(root.dependencies["a"]);
        assert_eq!(a.typings.as_deref(), Some("index.d.ts"));
    }

    #[test]
    fn test_diamond_shares_one_node() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "dependencies": {
                "a": "file:a/typack.json",
                "b": "file:b/typack.json"
            } }"#,
        );
        write(
            &dir.path().join("a/typack.json"),
            r#"{ "name": "a", "dependencies": { "shared": "file:../shared/typack.json" } }"#,
        );
        write(
            &dir.path().join("b/typack.json"),
            r#"{ "name": "b", "dependencies": { "shared": "file:../shared/typack.json" } }"#,
        );
        write(
            &dir.path().join("shared/typack.json"),
            r#"{ "name": "shared", "typings": "index.d.ts" }"#,
        );

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();

        // root + a + b + one shared node
        assert_eq!(tree.graph.len(), 4);
        let root = tree.graph.node(tree.root);
        let a = tree.graph.node(root.dependencies["a"]);
        let b = tree.graph.node(root.dependencies["b"]);
        assert_eq!(a.dependencies["shared"], b.dependencies["shared"]);
    }

    #[test]
    fn test_cycle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("a/typack.json"),
            r#"{ "name": "a", "dependencies": { "b": "file:../b/typack.json" } }"#,
        );
        write(
            &dir.path().join("b/typack.json"),
            r#"{ "name": "b", "dependencies": { "a": "file:../a/typack.json" } }"#,
        );

        let result = build_tree(&dir.path().join("a/typack.json"), &TreeOptions::default());
        assert!(matches!(result, Err(TreeError::CircularDependency(_))));
    }

    #[test]
    fn test_directory_location_resolves_to_its_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "dependencies": { "a": "file:a" } }"#,
        );
        write(
            &dir.path().join("a/typack.json"),
            r#"{ "name": "a", "typings": "index.d.ts" }"#,
        );

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();
        let root = tree.graph.node(tree.root);
        let a = tree.graph.node(root.dependencies["a"]);
        assert!(!a.missing);
        assert_eq!(a.typings.as_deref(), Some("index.d.ts"));
    }

    #[test]
    fn test_directory_without_manifest_becomes_missing() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "dependencies": { "a": "file:a" } }"#,
        );
        fs::create_dir_all(dir.path().join("a")).unwrap();

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();
        let root = tree.graph.node(tree.root);
        assert!(tree.graph.node(root.dependencies["a"]).missing);
    }

    #[test]
    fn test_unsupported_scheme_becomes_missing() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "dependencies": { "gone": "npm:left-pad" } }"#,
        );

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();
        let root = tree.graph.node(tree.root);
        let gone = tree.graph.node(root.dependencies["gone"]);
        assert!(gone.missing);
    }

    #[test]
    fn test_unreadable_location_becomes_missing() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "dependencies": { "gone": "file:nowhere/typack.json" } }"#,
        );

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();
        let root = tree.graph.node(tree.root);
        assert!(tree.graph.node(root.dependencies["gone"]).missing);
    }

    #[test]
    fn test_declaration_file_location_is_a_leaf() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "ambientDependencies": { "node": "file:node.d.ts" } }"#,
        );
        write(&dir.path().join("node.d.ts"), "declare var global: any\n");

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();
        let root = tree.graph.node(tree.root);
        let node = tree.graph.node(root.ambient_dependencies["node"]);
        assert_eq!(node.typings.as_deref(), Some("node.d.ts"));
        assert!(!node.missing);
    }

    #[test]
    fn test_production_skips_root_dev_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "devDependencies": { "helpers": "file:helpers/typack.json" } }"#,
        );
        write(
            &dir.path().join("helpers/typack.json"),
            r#"{ "name": "helpers", "typings": "index.d.ts" }"#,
        );

        let full = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();
        assert_eq!(full.graph.node(full.root).dev_dependencies.len(), 1);

        let production = build_tree(
            &dir.path().join("typack.json"),
            &TreeOptions { production: true },
        )
        .unwrap();
        assert!(production
            .graph
            .node(production.root)
            .dev_dependencies
            .is_empty());
    }

    #[test]
    fn test_transitive_dev_dependencies_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "dependencies": { "a": "file:a/typack.json" } }"#,
        );
        write(
            &dir.path().join("a/typack.json"),
            r#"{ "name": "a", "devDependencies": { "helpers": "file:helpers/typack.json" } }"#,
        );
        write(
            &dir.path().join("a/helpers/typack.json"),
            r#"{ "name": "helpers" }"#,
        );

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();
        let root = tree.graph.node(tree.root);
        let a = tree.graph.node(root.dependencies["a"]);
        assert!(a.dev_dependencies.is_empty());
    }

    #[test]
    fn test_browser_override_map_lands_on_node() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("typack.json"),
            r#"{ "name": "app", "browser": { "b": "browser.d.ts" },
                "dependencies": { "b": "file:b/typack.json" } }"#,
        );
        write(
            &dir.path().join("b/typack.json"),
            r#"{ "name": "b", "typings": "index.d.ts" }"#,
        );

        let tree = build_tree(&dir.path().join("typack.json"), &TreeOptions::default()).unwrap();
        let root = tree.graph.node(tree.root);
        assert_eq!(
            root.browser_overrides.get("b").map(String::as_str),
            Some("browser.d.ts")
        );
    }
}
