//! cloudstatic — sync static-site output to object storage and clean up after it.
//!
//! # Usage
//!
//! ```text
//! cloudstatic init --root <dir> --base-url <url> [--manifest-dir <dir>]
//! cloudstatic sync <local_folder> <remote_namespace> [--json]
//! cloudstatic remove <remote_namespace> [--except <remote_path>]... [--json]
//! cloudstatic url <remote_path>
//! ```
//!
//! Global flags: `--config <path>` to use a config file other than
//! `~/.cloudstatic/config.yaml`, `--verbose` for debug logging.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{init::InitArgs, remove::RemoveArgs, sync::SyncArgs, url::UrlArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "cloudstatic",
    version,
    about = "Sync local folders of static files to storage and purge what is gone",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config file to use instead of ~/.cloudstatic/config.yaml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log every copy, upsert, and removal.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a config pointing at a storage root and public URL.
    Init(InitArgs),

    /// Sync a local folder into a remote namespace, deleting stale objects.
    Sync(SyncArgs),

    /// Remove everything previously synced under a remote namespace.
    Remove(RemoveArgs),

    /// Print the public URL of a remote path.
    Url(UrlArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    match cli.command {
        Commands::Init(args) => args.run(&cli.global),
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Remove(args) => args.run(&cli.global),
        Commands::Url(args) => args.run(&cli.global),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
