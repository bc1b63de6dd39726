//! Declaration tree compilation
//!
//! Orchestrates the pipeline: allocate canonical names, select each
//! pass's entry files, then crawl the tree from the root's entry —
//! rewriting specifiers and emitting blocks post-order so referenced
//! modules appear before their dependents. Every module name is emitted
//! at most once per pass regardless of how many chains reach it. The
//! default and browser passes are independent compilations and may
//! produce identical output.

use crate::events::Emitter;
use crate::names::{allocate, NameTable};
use crate::rewrite::{module_path, rewrite, Reference, RewriteContext};
use crate::source::{absolutize, SourceError, SourceLoader};
use crate::tree::{DependencyGraph, NodeId};
use crate::variant::{select, EntryTable, Variant};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A dependency the resolver flagged as missing was referenced.
    #[error("missing dependency \"{name}\" referenced from {}", .from.display())]
    MissingDependency { name: String, from: PathBuf },

    /// A referenced node has neither typings nor a main entry to load.
    #[error("dependency \"{name}\" has no typings entry")]
    UnresolvedEntry { name: String },

    /// Source file absent or unreadable.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Compilation options.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Name the whole tree is exposed under.
    pub name: String,

    /// Base directory for resolving relative node paths.
    pub cwd: PathBuf,

    /// Compile the root unwrapped even when its own flag is unset.
    pub ambient: bool,

    /// Diagnostics sink.
    pub emitter: Emitter,
}

impl CompileOptions {
    /// Options exposing the tree under `name`, rooted at the process
    /// working directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cwd: PathBuf::from("."),
            ambient: false,
            emitter: Emitter::default(),
        }
    }

    /// Set the base directory for relative path resolution.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Compile the root as ambient content.
    pub fn with_ambient(mut self, ambient: bool) -> Self {
        self.ambient = ambient;
        self
    }

    /// Install a diagnostics sink.
    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = emitter;
        self
    }
}

/// The two flattened declaration scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledOutput {
    /// Default-pass script.
    pub main: String,
    /// Browser-pass script.
    pub browser: String,
}

static EXPORT_EQUALS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*export\s*=").unwrap());

/// Compile a resolved tree into its default and browser scripts.
pub fn compile(
    graph: &DependencyGraph,
    root: NodeId,
    options: &CompileOptions,
) -> Result<CompiledOutput, CompileError> {
    let root_node = graph.node(root);
    if root_node.missing {
        return Err(CompileError::MissingDependency {
            name: options.name.clone(),
            from: root_node.source_path.clone(),
        });
    }

    let root_ambient = options.ambient || root_node.ambient;
    let names = allocate(graph, root, &options.name, root_ambient);
    let mut loader = SourceLoader::new(options.emitter.clone());

    tracing::debug!(
        name = %options.name,
        ambient = root_ambient,
        "compiling declaration tree"
    );

    let main = compile_variant(
        graph,
        root,
        root_ambient,
        &names,
        &mut loader,
        options,
        Variant::Default,
    )?;
    let browser = compile_variant(
        graph,
        root,
        root_ambient,
        &names,
        &mut loader,
        options,
        Variant::Browser,
    )?;

    Ok(CompiledOutput { main, browser })
}

fn compile_variant(
    graph: &DependencyGraph,
    root: NodeId,
    root_ambient: bool,
    names: &NameTable,
    loader: &mut SourceLoader,
    options: &CompileOptions,
    variant: Variant,
) -> Result<String, CompileError> {
    tracing::debug!(?variant, "starting pass");
    let entries = select(graph, root, variant);

    let mut pass = Pass {
        graph,
        names,
        entries: &entries,
        options,
        loader,
        blocks: Vec::new(),
        seen_modules: HashSet::new(),
        seen_ambient_files: HashSet::new(),
        seeded: HashSet::new(),
        root,
        root_module: String::new(),
    };

    if root_ambient {
        pass.compile_node(root)?;
    } else {
        let entry = pass.entry_of(root)?;
        let text = pass.loader.load(&entry)?;
        if EXPORT_EQUALS_RE.is_match(&text) {
            // A single-symbol surface has no sub-path structure to alias:
            // wrap the entry directly under the requested name.
            pass.root_module = options.name.clone();
            pass.compile_file(root, &entry, options.name.clone())?;
        } else {
            let module = pass.internal_module_name(root, &entry);
            pass.root_module = module.clone();
            pass.compile_file(root, &entry, module.clone())?;
            pass.blocks.push(format!(
                "declare module '{}' {{\nexport * from '{}';\n}}",
                options.name, module
            ));
        }
    }

    Ok(pass.blocks.join("\n"))
}

/// One variant pass over the tree.
struct Pass<'a> {
    graph: &'a DependencyGraph,
    names: &'a NameTable,
    entries: &'a EntryTable,
    options: &'a CompileOptions,
    loader: &'a mut SourceLoader,
    blocks: Vec<String>,
    seen_modules: HashSet<String>,
    seen_ambient_files: HashSet<PathBuf>,
    seeded: HashSet<NodeId>,
    root: NodeId,
    root_module: String,
}

impl Pass<'_> {
    /// Compile a node's unconditional children: its ambient dependencies,
    /// plus every dependency of an ambient node (ambient text has no
    /// import statements to discover them through).
    fn seed(&mut self, id: NodeId) -> Result<(), CompileError> {
        if !self.seeded.insert(id) {
            return Ok(());
        }

        let graph = self.graph;
        let node = graph.node(id);
        if node.ambient {
            for (key, child) in node.dependencies.iter().chain(&node.dev_dependencies) {
                self.check_missing(*child, key, &node.source_path)?;
                self.compile_node(*child)?;
            }
        }
        for (key, child) in &node.ambient_dependencies {
            self.check_missing(*child, key, &node.source_path)?;
            self.compile_node(*child)?;
        }
        Ok(())
    }

    fn check_missing(&self, id: NodeId, key: &str, from: &Path) -> Result<(), CompileError> {
        if self.graph.node(id).missing {
            return Err(CompileError::MissingDependency {
                name: key.to_string(),
                from: from.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Compile a node reached by bare reference.
    fn compile_node(&mut self, id: NodeId) -> Result<(), CompileError> {
        let graph = self.graph;
        let node = graph.node(id);

        if node.ambient {
            self.seed(id)?;
            let entry = self.entry_of(id)?;
            if !self.seen_ambient_files.insert(entry.clone()) {
                return Ok(());
            }
            let text = self.loader.load(&entry)?;
            self.blocks.push(text.trim_end().to_string());
            return Ok(());
        }

        let module = if id == self.root {
            self.root_module.clone()
        } else {
            self.names
                .module_id(id)
                .expect("canonical name allocated for every reachable module")
                .to_string()
        };
        let entry = self.entry_of(id)?;
        self.compile_file(id, &entry, module)
    }

    /// Compile one file of a node under the given module name: children
    /// first, then this file's block.
    fn compile_file(
        &mut self,
        id: NodeId,
        file: &Path,
        module: String,
    ) -> Result<(), CompileError> {
        if !self.seen_modules.insert(module.clone()) {
            return Ok(());
        }
        self.seed(id)?;

        let text = self.loader.load(file)?;
        let graph = self.graph;
        let names = self.names;
        let cwd = &self.options.cwd;
        let base = absolutize(graph.node(id).base_dir(), cwd);
        let cx = RewriteContext {
            graph,
            names,
            node: id,
            file,
            base,
            cwd,
        };
        let rewritten = rewrite(&text, &cx)?;

        for reference in rewritten.references {
            match reference {
                Reference::File { node, file, module } => {
                    self.compile_file(node, &file, module)?;
                }
                Reference::Node { node } => self.compile_node(node)?,
            }
        }

        self.blocks.push(format!(
            "declare module '{}' {{\n{}\n}}",
            module,
            rewritten.text.trim_end()
        ));
        Ok(())
    }

    /// Absolute entry file selected for a node in this pass.
    fn entry_of(&self, id: NodeId) -> Result<PathBuf, CompileError> {
        match self.entries.entry(id) {
            Some(path) => Ok(absolutize(path, &self.options.cwd)),
            None => Err(CompileError::UnresolvedEntry {
                name: self.display_name(id),
            }),
        }
    }

    fn display_name(&self, id: NodeId) -> String {
        self.names
            .self_name(id)
            .map(str::to_string)
            .unwrap_or_else(|| self.graph.node(id).source_path.display().to_string())
    }

    /// Module name for one of a node's own files: its namespace prefix
    /// plus the file's path relative to the node's base directory.
    fn internal_module_name(&self, id: NodeId, file: &Path) -> String {
        let base = absolutize(self.graph.node(id).base_dir(), &self.options.cwd);
        let prefix = self.names.prefix(id).unwrap_or("");
        match file.strip_prefix(&base) {
            Ok(rel) => format!("{prefix}{}", module_path(rel)),
            Err(_) => {
                let stem = file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{prefix}{}", stem.strip_suffix(".d.ts").unwrap_or(&stem))
            }
        }
    }
}
