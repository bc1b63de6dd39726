//! Project initialization command
//!
//! Creates a new declaration package with typack.json.

use crate::manifest::{Manifest, ManifestError};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during project initialization
#[derive(Debug, Error)]
pub enum InitError {
    /// Project already exists
    #[error("project already exists: typack.json found in {0}")]
    AlreadyExists(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Manifest error
    #[error("manifest error: {0}")]
    ManifestError(#[from] ManifestError),
}

/// Initialize a new declaration package
///
/// Creates a typack.json and an empty typings entry in the directory.
pub fn init_project(dir: &Path, name: Option<&str>) -> Result<(), InitError> {
    let manifest_path = dir.join("typack.json");

    if manifest_path.exists() {
        return Err(InitError::AlreadyExists(dir.display().to_string()));
    }

    // Derive the package name from the directory name if not provided
    let package_name = name.map(|name| name.to_string()).unwrap_or_else(|| {
        dir.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("my-typings")
            .to_string()
    });

    let manifest = Manifest {
        name: package_name.clone(),
        typings: Some("index.d.ts".to_string()),
        ..Default::default()
    };

    manifest.validate()?;
    fs::create_dir_all(dir)?;
    manifest.to_file(&manifest_path)?;

    let typings_path = dir.join("index.d.ts");
    if !typings_path.exists() {
        fs::write(&typings_path, "export {}\n")?;
    }

    println!("Created new declaration package: {package_name}");
    println!("  - typack.json");
    println!("  - index.d.ts");

    Ok(())
}
