//! Error taxonomy for the bundler
//!
//! Every fallible path surfaces one of these variants through `anyhow`, so
//! callers can downcast when they need to distinguish a missing manifest from
//! a malformed one. The first error encountered aborts the whole build; no
//! partial bundle is ever produced.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    /// No manifest exists at the conventional location for a declared
    /// dependency (or at the entry path itself).
    #[error("manifest not found at {}", path.display())]
    ManifestNotFound { path: PathBuf },

    /// The manifest file exists but is not valid JSON (or lacks required
    /// fields).
    #[error("failed to parse manifest {}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A file could not be read during module discovery or loading.
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A module filename yields no usable module name (wrong or missing
    /// extension).
    #[error("no module name can be derived from {}", path.display())]
    InvalidModuleName { path: PathBuf },

    /// An injected tie value could not be serialized into the bundle.
    #[error("tie value for `{tie}` cannot be serialized")]
    Serialization {
        tie: String,
        #[source]
        source: serde_json::Error,
    },
}
