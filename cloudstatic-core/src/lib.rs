//! cloudstatic core library — domain types, collaborator errors, configuration.
//!
//! - [`types`] — `RemotePath`, `CopyTask`, `ManifestEntry`
//! - [`error`] — [`ConfigError`], [`StorageError`], [`ManifestError`]
//! - [`config`] — load / save / init of `~/.cloudstatic/config.yaml`

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ManifestConfig, StorageConfig, DEFAULT_COLLECTION, DEFAULT_CONCURRENCY};
pub use error::{ConfigError, ManifestError, StorageError};
pub use types::{CopyTask, ManifestEntry, RemotePath};
