//! `cloudstatic remove` — purge a previously synced namespace.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use cloudstatic_core::RemotePath;
use cloudstatic_sync::ReconcileReport;

use crate::GlobalArgs;

/// Arguments for `cloudstatic remove`.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Remote namespace to purge, e.g. /site.
    pub remote_namespace: String,

    /// Remote path to keep (repeatable).
    #[arg(long, value_name = "REMOTE_PATH")]
    pub except: Vec<String>,

    /// Print the removal report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RemoveArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let (runtime, engine) = super::engine(global)?;
        let except: Vec<RemotePath> = self.except.iter().map(|p| RemotePath::from(p.as_str())).collect();
        let report = runtime
            .block_on(engine.remove_folder(self.remote_namespace.as_str(), &except))
            .with_context(|| format!("remove failed for '{}'", self.remote_namespace))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
            return Ok(());
        }

        if report.orphan_count() == 0 {
            println!("✓ '{}': nothing to remove", self.remote_namespace);
            return Ok(());
        }
        println!(
            "{} '{}' removed ({} objects, {} kept)",
            "✓".green().bold(),
            self.remote_namespace,
            report.orphan_count(),
            except.len(),
        );
        print_reconcile(&report);
        Ok(())
    }
}

pub(crate) fn print_reconcile(report: &ReconcileReport) {
    for path in &report.removed {
        println!("  {}  {path}", "✗".red());
    }
    for path in &report.already_absent {
        println!("  ·  {path} (already gone)");
    }
    for failure in &report.remove_failures {
        println!(
            "  {}  {} ({})",
            "!".yellow().bold(),
            failure.remote_path,
            failure.cause
        );
    }
}
