use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::info;

use onefile::{
    config::Config,
    error::BundleError,
    orchestrator::{BuildOptions, BundleOrchestrator},
    render::Tie,
};

#[derive(Debug, Parser)]
#[command(
    name = "onefile",
    version,
    about = "Bundle a CommonJS package and its dependencies into a single .js file"
)]
struct Cli {
    /// Path of the entry package's manifest (package.json)
    manifest: PathBuf,

    /// Write the bundle to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit build metadata and re-evaluate the entry module on every access
    #[arg(long)]
    debug: bool,

    /// Inject a host value into the bundle's top-level scope (repeatable)
    #[arg(long = "tie", value_name = "NAME=JSON")]
    ties: Vec<String>,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Explicit config file (defaults to onefile.toml next to the manifest)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn parse_tie(raw: &str) -> Result<Tie> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("tie `{raw}` must have the form NAME=JSON"))?;
    let value = serde_json::from_str(value).map_err(|source| BundleError::Serialization {
        tie: name.to_owned(),
        source,
    })?;
    Ok(Tie {
        name: name.to_owned(),
        value,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let manifest_dir = cli.manifest.parent().unwrap_or_else(|| Path::new("."));
            Config::discover(manifest_dir)?
        }
    };

    let ties = cli
        .ties
        .iter()
        .map(|raw| parse_tie(raw))
        .collect::<Result<Vec<_>>>()?;

    let options = BuildOptions {
        manifest_path: cli.manifest.clone(),
        debug: cli.debug,
        ties,
    };
    let bundle = BundleOrchestrator::new(config).build(&options)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &bundle)
                .with_context(|| format!("failed to write bundle to {}", path.display()))?;
            info!("wrote {} bytes to {}", bundle.len(), path.display());
        }
        None => {
            std::io::stdout()
                .write_all(bundle.as_bytes())
                .context("failed to write bundle to stdout")?;
        }
    }

    Ok(())
}
