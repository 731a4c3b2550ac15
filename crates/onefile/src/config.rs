//! Bundler configuration
//!
//! Conventions that the resolver and module discovery rely on. Defaults match
//! the npm ecosystem; a `onefile.toml` next to the entry manifest can
//! override them.

use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::error::BundleError;

/// File name of the optional configuration file.
pub const CONFIG_FILE_NAME: &str = "onefile.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory name under which a package's dependencies live,
    /// one subdirectory per dependency name.
    pub dependency_dir: String,

    /// Recognized source file extension, without the leading dot.
    pub module_extension: String,

    /// Source directory used when a manifest has no `directories.lib`.
    pub default_source_dir: String,

    /// Entry module name used when a manifest has no `main`.
    pub default_main: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dependency_dir: "node_modules".into(),
            module_extension: "js".into(),
            default_source_dir: "lib".into(),
            default_main: "index".into(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BundleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load `onefile.toml` from the given directory when present, otherwise
    /// fall back to the defaults.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            debug!("using config file at {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}
