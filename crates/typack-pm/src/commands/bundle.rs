//! Bundle command
//!
//! Builds the dependency tree for a project and compiles it into flat
//! declaration scripts, one per variant.

use crate::resolve::{build_tree, TreeError, TreeOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::{fs, io};
use thiserror::Error;
use typack_core::{compile, CompileError, CompileOptions, Emitter, Event};

/// Errors that can occur during bundling
#[derive(Debug, Error)]
pub enum BundleError {
    /// No typack.json found
    #[error("no typack.json found in {}. Run `typack init` to create a project.", .0.display())]
    NoManifest(PathBuf),

    /// Tree construction error
    #[error("tree error: {0}")]
    TreeError(#[from] TreeError),

    /// Compilation error
    #[error("compile error: {0}")]
    CompileError(#[from] CompileError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Bundle options
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Module name for the output (defaults to the manifest name)
    pub name: Option<String>,

    /// Compile the root as ambient content
    pub ambient: bool,

    /// Skip devDependencies
    pub production: bool,

    /// Write the default-variant output here instead of stdout
    pub out: Option<PathBuf>,

    /// Write the browser-variant output here
    pub browser_out: Option<PathBuf>,
}

/// Bundle the project in `dir` into flat declaration scripts.
pub fn bundle_project(dir: &Path, options: &BundleOptions) -> Result<(), BundleError> {
    let manifest_path = dir.join("typack.json");
    if !manifest_path.exists() {
        return Err(BundleError::NoManifest(dir.to_path_buf()));
    }

    let tree = build_tree(
        &manifest_path,
        &TreeOptions {
            production: options.production,
        },
    )?;
    let name = options.name.clone().unwrap_or_else(|| tree.name.clone());

    // Report each stripped reference once, however many files repeat it.
    let reported = Mutex::new(HashSet::new());
    let emitter = Emitter::new(move |event| {
        let Event::Reference { reference, path } = event;
        if reported.lock().unwrap().insert(reference.clone()) {
            println!(
                "Stripped reference \"{}\" while reading {}",
                reference,
                path.display()
            );
        }
    });

    let compile_options = CompileOptions::new(name.as_str())
        .with_cwd(dir)
        .with_ambient(options.ambient)
        .with_emitter(emitter);
    let output = compile(&tree.graph, tree.root, &compile_options)?;

    match &options.out {
        Some(path) => {
            fs::write(path, format!("{}\n", output.main))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", output.main),
    }

    if let Some(path) = &options.browser_out {
        fs::write(path, format!("{}\n", output.browser))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
