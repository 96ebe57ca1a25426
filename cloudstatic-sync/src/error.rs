//! Error types for cloudstatic-sync.

use std::path::PathBuf;

use thiserror::Error;

use cloudstatic_core::{ManifestError, RemotePath, StorageError};

/// All errors that can end a `sync_folder` or `remove_folder` call.
///
/// Each variant names the phase that failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required collaborator or option was missing or invalid at init.
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    /// The local tree could not be walked. Nothing was transferred.
    #[error("failed to enumerate {path}: {source}")]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// At least one file failed to copy. Reconciliation was not run.
    #[error("failed to copy {local} to {remote} ({failed} of {total} transfers failed): {source}")]
    Transfer {
        local: PathBuf,
        remote: RemotePath,
        failed: usize,
        total: usize,
        #[source]
        source: StorageError,
    },

    /// A document-store call failed during the named phase.
    #[error("manifest {phase} failed for {target}: {source}")]
    Manifest {
        phase: &'static str,
        target: String,
        #[source]
        source: ManifestError,
    },

    /// A blocking helper task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Convenience constructor for [`SyncError::Enumeration`].
pub(crate) fn enum_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Enumeration {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Manifest`].
pub(crate) fn manifest_err(
    phase: &'static str,
    target: impl ToString,
    source: ManifestError,
) -> SyncError {
    SyncError::Manifest {
        phase,
        target: target.to_string(),
        source,
    }
}
