//! `cloudstatic sync` — copy a local folder into a remote namespace.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use cloudstatic_sync::SyncReport;

use crate::GlobalArgs;

/// Arguments for `cloudstatic sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Local folder to upload.
    pub local_folder: PathBuf,

    /// Remote namespace, e.g. /site. Existing objects under it that are not
    /// in the local folder are deleted.
    pub remote_namespace: String,

    /// Print the sync report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let (runtime, engine) = super::engine(global)?;
        let report = runtime
            .block_on(engine.sync_folder(&self.local_folder, self.remote_namespace.as_str()))
            .with_context(|| {
                format!(
                    "sync failed for '{}' -> '{}'",
                    self.local_folder.display(),
                    self.remote_namespace
                )
            })?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    let removed = &report.reconcile;
    println!(
        "{} '{}' synced ({} copied, {} removed)",
        "✓".green().bold(),
        report.namespace,
        report.copied.len(),
        removed.orphan_count(),
    );
    for path in &report.copied {
        println!("  ✎  {path}");
    }
    super::remove::print_reconcile(removed);
}
