pub mod init;
pub mod remove;
pub mod sync;
pub mod url;

use anyhow::{Context, Result};

use cloudstatic_core::{config, Config};
use cloudstatic_sync::CloudStatic;

use crate::GlobalArgs;

/// Load `--config` if given, else `~/.cloudstatic/config.yaml`.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    match &global.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("failed to load config '{}'", path.display())),
        None => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            config::load_at(&home).context("failed to load config")
        }
    }
}

/// Load config, start a runtime, and initialise the engine on it.
pub fn engine(global: &GlobalArgs) -> Result<(tokio::runtime::Runtime, CloudStatic)> {
    let config = load_config(global)?;
    tracing::debug!(
        root = %config.storage.root.display(),
        collection = %config.manifest.collection,
        concurrency = config.concurrency,
        "loaded config",
    );
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let engine = runtime
        .block_on(CloudStatic::from_config(&config))
        .context("failed to initialise cloudstatic")?;
    Ok((runtime, engine))
}
