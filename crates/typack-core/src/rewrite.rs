//! Specifier rewriting
//!
//! A restricted grammar matcher, deliberately not a parser: it recognizes
//! one reference-bearing statement per line (import-from, bare import,
//! `import x = require(...)`, re-export-from, and declared module names),
//! replaces only the quoted specifier span, and copies every other line
//! byte-for-byte. References it cannot resolve stay untouched — the
//! consuming compiler surfaces those downstream.

use crate::compile::CompileError;
use crate::names::NameTable;
use crate::source::{absolutize, ensure_dts, normalize};
use crate::tree::{DependencyGraph, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Everything a rewrite needs to resolve specifiers for one file.
pub(crate) struct RewriteContext<'a> {
    pub graph: &'a DependencyGraph,
    pub names: &'a NameTable,
    pub node: NodeId,
    /// Absolute path of the file being rewritten.
    pub file: &'a Path,
    /// Absolute base directory of the node.
    pub base: PathBuf,
    pub cwd: &'a Path,
}

/// Rewritten text plus the references it turned up, in order of first
/// appearance.
pub(crate) struct Rewrite {
    pub text: String,
    pub references: Vec<Reference>,
}

/// A cross-file reference discovered while rewriting.
pub(crate) enum Reference {
    /// A concrete file with its module name already decided (an internal
    /// module or a sub-path into a dependency).
    File {
        node: NodeId,
        file: PathBuf,
        module: String,
    },
    /// A node reached by bare key; its selected entry file compiles under
    /// its canonical identifier.
    Node { node: NodeId },
}

static STATEMENT_RES: Lazy<[Regex; 5]> = Lazy::new(|| {
    [
        // import x = require('...')
        Regex::new(
            r#"^\s*(?:export\s+)?import\s+[A-Za-z_$][\w$]*\s*=\s*require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        )
        .unwrap(),
        // import ... from '...'
        Regex::new(r#"^\s*import\b[^'"]*\bfrom\s*['"]([^'"]+)['"]"#).unwrap(),
        // import '...'
        Regex::new(r#"^\s*import\s*['"]([^'"]+)['"]"#).unwrap(),
        // export ... from '...'
        Regex::new(r#"^\s*export\b[^'"]*\bfrom\s*['"]([^'"]+)['"]"#).unwrap(),
        // declare module '...'
        Regex::new(r#"^\s*(?:declare\s+)?module\s+['"]([^'"]+)['"]"#).unwrap(),
    ]
});

/// Locate the specifier in a reference-bearing line, if it is one.
fn find_specifier(line: &str) -> Option<(Range<usize>, &str)> {
    for re in STATEMENT_RES.iter() {
        if let Some(caps) = re.captures(line) {
            if let Some(m) = caps.get(1) {
                return Some((m.range(), m.as_str()));
            }
        }
    }
    None
}

/// Rewrite one file's text against the canonical name table.
pub(crate) fn rewrite(text: &str, cx: &RewriteContext<'_>) -> Result<Rewrite, CompileError> {
    let mut out = String::with_capacity(text.len());
    let mut references = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match find_specifier(line) {
            Some((range, specifier)) => match resolve(specifier, cx, &mut references)? {
                Some(replacement) => {
                    out.push_str(&line[..range.start]);
                    out.push_str(&replacement);
                    out.push_str(&line[range.end..]);
                }
                None => out.push_str(line),
            },
            None => out.push_str(line),
        }
    }

    Ok(Rewrite {
        text: out,
        references,
    })
}

/// Resolve one specifier. `Ok(Some(..))` replaces the span, `Ok(None)`
/// keeps the original text.
fn resolve(
    spec: &str,
    cx: &RewriteContext<'_>,
    references: &mut Vec<Reference>,
) -> Result<Option<String>, CompileError> {
    let node = cx.graph.node(cx.node);

    // Relative specifier: another file of this node.
    if spec.starts_with("./") || spec.starts_with("../") {
        let dir = cx.file.parent().unwrap_or_else(|| Path::new(""));
        let target = normalize(&dir.join(ensure_dts(spec)));
        let rel = match target.strip_prefix(&cx.base) {
            Ok(rel) => rel,
            Err(_) => {
                tracing::warn!(
                    specifier = spec,
                    file = %cx.file.display(),
                    "relative reference escapes its package; left unchanged"
                );
                return Ok(None);
            }
        };
        let prefix = cx.names.prefix(cx.node).unwrap_or("");
        let module = format!("{prefix}{}", module_path(rel));
        references.push(Reference::File {
            node: cx.node,
            file: target,
            module: module.clone(),
        });
        return Ok(Some(module));
    }

    let (head, sub) = match spec.find('/') {
        Some(i) => (&spec[..i], Some(&spec[i + 1..])),
        None => (spec, None),
    };

    // A local dependency key, bare or with a sub-path.
    if let Some(child) = node.local_dependency(head) {
        let child_node = cx.graph.node(child);
        if child_node.missing {
            return Err(CompileError::MissingDependency {
                name: head.to_string(),
                from: cx.file.to_path_buf(),
            });
        }

        if child_node.ambient {
            // Ambient content keeps its own declared names.
            if sub.is_some() {
                tracing::warn!(
                    specifier = spec,
                    file = %cx.file.display(),
                    "sub-path into ambient dependency left unchanged"
                );
            }
            references.push(Reference::Node { node: child });
            return Ok(None);
        }

        let id = match cx.names.module_id(child) {
            Some(id) => id,
            None => return Ok(None),
        };
        return Ok(Some(match sub {
            None => {
                references.push(Reference::Node { node: child });
                id.to_string()
            }
            Some(sub) => {
                let child_base = absolutize(child_node.base_dir(), cx.cwd);
                let file = normalize(&child_base.join(ensure_dts(sub)));
                let module = format!("{id}/{}", sub.strip_suffix(".d.ts").unwrap_or(sub));
                references.push(Reference::File {
                    node: child,
                    file,
                    module: module.clone(),
                });
                module
            }
        }));
    }

    // Self-reference: the node's own name, bare or with a sub-path.
    if let Some(self_name) = cx.names.self_name(cx.node) {
        if spec == self_name {
            if let Some(id) = cx.names.module_id(cx.node) {
                references.push(Reference::Node { node: cx.node });
                return Ok(Some(id.to_string()));
            }
        } else if let Some(rest) = spec
            .strip_prefix(self_name)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            let prefix = cx.names.prefix(cx.node).unwrap_or("");
            let module = format!("{prefix}{}", rest.strip_suffix(".d.ts").unwrap_or(rest));
            let file = normalize(&cx.base.join(ensure_dts(rest)));
            references.push(Reference::File {
                node: cx.node,
                file,
                module: module.clone(),
            });
            return Ok(Some(module));
        }
    }

    tracing::warn!(
        specifier = spec,
        file = %cx.file.display(),
        "unresolved module reference left unchanged"
    );
    Ok(None)
}

/// Module path for a file relative to its node's base directory: forward
/// slashes, declaration extension stripped.
pub(crate) fn module_path(rel: &Path) -> String {
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    joined
        .strip_suffix(".d.ts")
        .map(str::to_string)
        .unwrap_or(joined)
}
