//! Typack package manager library
//!
//! This crate provides the package-manager surface around the typack
//! compiler core, including:
//! - Package manifest parsing (typack.json)
//! - Dependency tree construction from local `file:` locations
//! - The `typack` CLI commands (init, tree, bundle)
//!
//! Network sources are out of scope: locations this crate cannot resolve
//! locally become `missing` placeholder nodes, and compiling a reference
//! to one fails fast.

pub mod commands;
pub mod manifest;
pub mod resolve;

pub use manifest::{BrowserField, Location, Manifest, ManifestError};
pub use resolve::{build_tree, ResolvedTree, TreeError, TreeOptions};
