//! Package manifest loading
//!
//! A manifest is the conventional `package.json` record: name, entry module,
//! source directory map, and declared dependencies. Version ranges are kept
//! verbatim but their semantics are ignored — a declared dependency is
//! satisfied by whatever is present on disk.

use std::path::Path;

use anyhow::Result;
use indexmap::IndexMap;
use log::trace;
use serde::Deserialize;

use crate::error::BundleError;

/// Conventional manifest file name within a package directory.
pub const MANIFEST_FILE_NAME: &str = "package.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: String,

    /// Relative path of the entry module; extension optional.
    pub main: Option<String>,

    #[serde(default)]
    pub directories: Directories,

    /// Declared dependency name -> version range. Declaration order is
    /// preserved; it drives resolution and emission order.
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Directories {
    /// Relative path of the module source directory.
    pub lib: Option<String>,
}

/// Load and parse a manifest file.
///
/// Fails with `ManifestNotFound` when no file exists at the path and with
/// `ManifestParse` on malformed content.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    if !path.is_file() {
        return Err(BundleError::ManifestNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(|source| BundleError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let manifest: Manifest =
        serde_json::from_str(&content).map_err(|source| BundleError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;

    trace!(
        "loaded manifest `{}` with {} declared dependencies",
        manifest.name,
        manifest.dependencies.len()
    );
    Ok(manifest)
}
