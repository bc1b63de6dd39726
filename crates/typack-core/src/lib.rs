//! Typack declaration tree compiler
//!
//! Takes an already-resolved tree of declaration packages and merges it
//! into one or two flattened declaration scripts:
//! - Canonical, collision-free module names for every package
//! - Per-pass source selection (default vs browser)
//! - Statement-level specifier rewriting
//! - Deterministic post-order emission
//!
//! Graph construction, network fetching, and on-disk caching belong to
//! the calling crates; the compiler reads an immutable
//! [`tree::DependencyGraph`] and produces text.

#![warn(rust_2018_idioms)]

pub mod compile;
pub mod events;
pub mod names;
mod rewrite;
pub mod source;
pub mod tree;
pub mod variant;

pub use compile::{compile, CompileError, CompileOptions, CompiledOutput};
pub use events::{Emitter, Event};
pub use names::{allocate, NameTable};
pub use source::{SourceError, SourceLoader};
pub use tree::{DependencyGraph, DependencyNode, NodeId};
pub use variant::{select, EntryTable, Variant};
