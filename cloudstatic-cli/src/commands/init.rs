//! `cloudstatic init --root <dir> --base-url <url> [--manifest-dir <dir>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use cloudstatic_core::config;

use crate::GlobalArgs;

/// Write ~/.cloudstatic/config.yaml.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory that holds synced objects (the local storage root).
    #[arg(long)]
    pub root: PathBuf,

    /// Public URL at which `root` is served, e.g. http://localhost:7901/uploads.
    #[arg(long)]
    pub base_url: String,

    /// Directory for manifest collections. Defaults to ~/.cloudstatic/manifest.
    #[arg(long)]
    pub manifest_dir: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        if global.config.is_some() {
            anyhow::bail!("`init` always writes ~/.cloudstatic/config.yaml; drop --config");
        }
        let home = dirs::home_dir().context("could not determine home directory")?;
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("cannot create storage root '{}'", self.root.display()))?;
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.root.display()))?;

        let config = config::init_at(&home, root, &self.base_url, self.manifest_dir)
            .context("failed to write config")?;

        println!("✓ Storage root: {}", config.storage.root.display());
        println!("  Public URL:   {}", config.storage.base_url);
        println!("  Manifest:     {}", config.manifest.dir.display());
        println!("  Saved to: ~/.cloudstatic/config.yaml");
        Ok(())
    }
}
