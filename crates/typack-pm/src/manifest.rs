//! Package manifest parsing (typack.json)
//!
//! Provides structures and parsing for typack declaration-package
//! manifests. Dependency maps keep their insertion order — it decides
//! the deterministic emission order downstream.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during manifest parsing
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse JSON
    #[error("failed to parse manifest: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Validation error
    #[error("invalid manifest: {0}")]
    ValidationError(String),
}

/// Package manifest (typack.json)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Package name (must be unique within its tree)
    pub name: String,

    /// Entry module; `<main>.d.ts` is loaded when no typings path is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// Typings entry file, relative to the manifest directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typings: Option<String>,

    /// Browser-specific typings path, or per-dependency override map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserField>,

    /// Whether this package declares ambient (global) content
    #[serde(default, skip_serializing_if = "is_false")]
    pub ambient: bool,

    /// Runtime dependencies (key → location)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,

    /// Development-only dependencies
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, String>,

    /// Ambient dependencies
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub ambient_dependencies: IndexMap<String, String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The `browser` manifest field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BrowserField {
    /// Replacement typings path for the browser pass
    Path(String),

    /// Per-dependency override map (key → replacement typings path)
    Overrides(IndexMap<String, String>),
}

/// A dependency location string from the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// `file:` path relative to the manifest directory, pointing at
    /// another typack.json or directly at a `.d.ts` file
    File(PathBuf),

    /// Any scheme this build cannot fetch (npm:, github:, URLs, ...)
    Unsupported(String),
}

impl Location {
    /// Parse a raw location string.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix("file:") {
            Some(path) => Location::File(PathBuf::from(path)),
            None => Location::Unsupported(raw.to_string()),
        }
    }
}

impl Manifest {
    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a manifest from a string
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.is_empty() {
            return Err(ManifestError::ValidationError(
                "package name cannot be empty".to_string(),
            ));
        }

        // Names and keys become module path segments in the compiled
        // output, so the namespace syntax is reserved.
        if !is_valid_name(&self.name) {
            return Err(ManifestError::ValidationError(format!(
                "invalid package name: {}. Names must not contain '!', '/', quotes, or whitespace",
                self.name
            )));
        }

        for map in [
            &self.dependencies,
            &self.dev_dependencies,
            &self.ambient_dependencies,
        ] {
            for (key, location) in map {
                validate_dependency(key, location)?;
            }
        }

        Ok(())
    }

    /// Write manifest to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ManifestError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, format!("{content}\n"))?;
        Ok(())
    }

    /// Browser-specific typings path, when the `browser` field is one
    pub fn browser_typings(&self) -> Option<&str> {
        match &self.browser {
            Some(BrowserField::Path(path)) => Some(path),
            _ => None,
        }
    }

    /// Per-dependency browser overrides, when the `browser` field is a map
    pub fn browser_overrides(&self) -> Option<&IndexMap<String, String>> {
        match &self.browser {
            Some(BrowserField::Overrides(map)) => Some(map),
            _ => None,
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c == '!' || c == '/' || c == '\'' || c == '"' || c.is_whitespace())
}

fn validate_dependency(key: &str, location: &str) -> Result<(), ManifestError> {
    if !is_valid_name(key) {
        return Err(ManifestError::ValidationError(format!(
            "invalid dependency key: {key:?}"
        )));
    }

    if location.is_empty() {
        return Err(ManifestError::ValidationError(format!(
            "dependency '{key}' has an empty location"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let json = r#"{
  "name": "my-typings",
  "main": "index",
  "browser": "index.browser.d.ts",
  "dependencies": {
    "a": "file:a/typack.json",
    "b": "file:b/typack.json"
  },
  "devDependencies": {
    "test-helpers": "file:helpers/typack.json"
  },
  "ambientDependencies": {
    "node": "file:node.d.ts"
  }
}"#;

        let manifest = Manifest::from_str(json).unwrap();
        assert_eq!(manifest.name, "my-typings");
        assert_eq!(manifest.main.as_deref(), Some("index"));
        assert_eq!(manifest.browser_typings(), Some("index.browser.d.ts"));
        assert!(!manifest.ambient);
        assert_eq!(manifest.dependencies.len(), 2);
        assert_eq!(manifest.dev_dependencies.len(), 1);
        assert_eq!(manifest.ambient_dependencies.len(), 1);
    }

    #[test]
    fn test_dependencies_keep_manifest_order() {
        let json = r#"{
  "name": "ordered",
  "dependencies": {
    "zed": "file:zed/typack.json",
    "alpha": "file:alpha/typack.json",
    "mid": "file:mid/typack.json"
  }
}"#;

        let manifest = Manifest::from_str(json).unwrap();
        let keys: Vec<&str> = manifest.dependencies.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zed", "alpha", "mid"]);
    }

    #[test]
    fn test_browser_override_map() {
        let json = r#"{
  "name": "pkg",
  "browser": { "b": "browser.d.ts" }
}"#;

        let manifest = Manifest::from_str(json).unwrap();
        assert_eq!(manifest.browser_typings(), None);
        let overrides = manifest.browser_overrides().unwrap();
        assert_eq!(overrides.get("b").map(String::as_str), Some("browser.d.ts"));
    }

    #[test]
    fn test_ambient_flag() {
        let manifest = Manifest::from_str(r#"{ "name": "node", "ambient": true }"#).unwrap();
        assert!(manifest.ambient);
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let result = Manifest::from_str(r#"{ "name": "" }"#);
        assert!(matches!(result, Err(ManifestError::ValidationError(_))));
    }

    #[test]
    fn test_name_with_namespace_syntax_is_invalid() {
        for name in ["a!b", "a/b", "a b", "a'b"] {
            let json = format!(r#"{{ "name": "{name}" }}"#);
            let result = Manifest::from_str(&json);
            assert!(
                matches!(result, Err(ManifestError::ValidationError(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_location_is_invalid() {
        let json = r#"{ "name": "pkg", "dependencies": { "a": "" } }"#;
        let result = Manifest::from_str(json);
        assert!(matches!(result, Err(ManifestError::ValidationError(_))));
    }

    #[test]
    fn test_location_parse() {
        assert_eq!(
            Location::parse("file:a/typack.json"),
            Location::File(PathBuf::from("a/typack.json"))
        );
        assert_eq!(
            Location::parse("npm:left-pad"),
            Location::Unsupported("npm:left-pad".to_string())
        );
        assert_eq!(
            Location::parse("https://example.com/x.d.ts"),
            Location::Unsupported("https://example.com/x.d.ts".to_string())
        );
    }

    #[test]
    fn test_round_trip() {
        let mut manifest = Manifest {
            name: "round-trip".to_string(),
            typings: Some("index.d.ts".to_string()),
            ..Default::default()
        };
        manifest
            .dependencies
            .insert("a".to_string(), "file:a/typack.json".to_string());

        let serialized = serde_json::to_string_pretty(&manifest).unwrap();
        let deserialized: Manifest = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, manifest);
    }
}
