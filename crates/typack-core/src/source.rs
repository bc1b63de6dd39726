//! Source loading
//!
//! Thin wrapper over the filesystem: reads declaration text, caches it by
//! path for the lifetime of one compilation, and strips triple-slash
//! reference directives, reporting each through the diagnostics emitter.
//! A file without directives round-trips unchanged.

use crate::events::{Emitter, Event};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::{fs, io};
use thiserror::Error;

/// Errors raised while loading declaration sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source file absent or unreadable.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*///\s*<reference\s+(?:path|types)\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// Path-keyed read cache for one compilation. Both variant passes share
/// the same loader.
#[derive(Debug)]
pub struct SourceLoader {
    cache: HashMap<PathBuf, Arc<str>>,
    emitter: Emitter,
}

impl SourceLoader {
    /// Create a loader reporting stripped references to `emitter`.
    pub fn new(emitter: Emitter) -> Self {
        Self {
            cache: HashMap::new(),
            emitter,
        }
    }

    /// Load the file at `path`, reusing the cached text when the same
    /// physical file backs multiple nodes or variants.
    pub fn load(&mut self, path: &Path) -> Result<Arc<str>, SourceError> {
        if let Some(text) = self.cache.get(path) {
            return Ok(text.clone());
        }

        let raw = fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let text: Arc<str> = self.strip_references(path, raw).into();
        self.cache.insert(path.to_path_buf(), text.clone());
        Ok(text)
    }

    /// Remove reference directive lines, reporting each one. Whatever
    /// cross-file linkage the directive expressed is intentionally
    /// dropped before compilation sees the text.
    fn strip_references(&self, path: &Path, raw: String) -> String {
        if !raw.contains("<reference") {
            return raw;
        }

        let mut kept = Vec::new();
        for line in raw.lines() {
            match REFERENCE_RE.captures(line) {
                Some(caps) => {
                    let reference = caps[1].to_string();
                    tracing::debug!(
                        reference = %reference,
                        file = %path.display(),
                        "stripped reference directive"
                    );
                    self.emitter.emit(&Event::Reference {
                        reference,
                        path: path.to_path_buf(),
                    });
                }
                None => kept.push(line),
            }
        }
        kept.join("\n")
    }
}

/// Lexically normalize a path: drop `.` components and resolve `..`
/// against the preceding component.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            Component::CurDir => {}
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Resolve a path against `cwd` when relative, normalizing either way.
pub(crate) fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&cwd.join(path))
    }
}

/// Append the declaration extension unless already present.
pub(crate) fn ensure_dts(path: &str) -> String {
    if path.ends_with(".d.ts") {
        path.to_string()
    } else {
        format!("{path}.d.ts")
    }
}
