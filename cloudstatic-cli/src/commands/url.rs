//! `cloudstatic url <remote_path>`

use anyhow::Result;
use clap::Args;

use cloudstatic_sync::{LocalStorage, StorageBackend};

use crate::GlobalArgs;

#[derive(Args, Debug)]
pub struct UrlArgs {
    /// Remote path, e.g. /site/index.html.
    pub remote_path: String,
}

impl UrlArgs {
    /// Resolved from config alone: no runtime, no manifest access.
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = super::load_config(global)?;
        let storage = LocalStorage::new(&config.storage.root, &config.storage.base_url);
        println!("{}{}", storage.get_url(), self.remote_path);
        Ok(())
    }
}
