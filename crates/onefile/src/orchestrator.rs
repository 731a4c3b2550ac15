//! Build orchestration
//!
//! Composes the pipeline: resolve the root package, flatten the dependency
//! tree, render the bundle text. Persisting the result is the caller's job.

use std::path::PathBuf;

use anyhow::Result;
use log::{debug, info};

use crate::{
    config::Config,
    flatten::flatten,
    render::{Tie, render_bundle},
    resolver::ResolutionContext,
};

/// Input for one bundle build.
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Path of the entry package's manifest.
    pub manifest_path: PathBuf,
    /// Emit build metadata into the bundle and re-evaluate the entry module
    /// on every access.
    pub debug: bool,
    /// Host values injected into the bundle's top-level scope.
    pub ties: Vec<Tie>,
}

#[derive(Debug, Default)]
pub struct BundleOrchestrator {
    config: Config,
}

impl BundleOrchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Produce the bundle text. The first error anywhere in resolution,
    /// discovery, or rendering aborts the build; no partial bundle.
    pub fn build(&self, options: &BuildOptions) -> Result<String> {
        let mut ctx = ResolutionContext::new(self.config.clone());
        let root = ctx.resolve_root(&options.manifest_path)?;
        info!(
            "resolved {} packages for `{}`",
            ctx.packages.len(),
            ctx.package(root).name
        );

        let order = flatten(&ctx, root);
        debug!("emission order: {} packages", order.len());

        render_bundle(&ctx, root, &order, options.debug, &options.ties)
    }
}

/// Build a bundle with the default configuration.
pub fn build(options: &BuildOptions) -> Result<String> {
    BundleOrchestrator::default().build(options)
}
