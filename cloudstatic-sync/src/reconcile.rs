//! Orphan reconciliation.
//!
//! For every manifest entry under a namespace that is not in the survive
//! set, the remote object is removed first and the manifest entry second.
//! A crash between the two leaves an entry pointing at an object that is
//! already gone, which the next pass tolerates. The reverse order could
//! leave an object in storage that no manifest entry describes.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use cloudstatic_core::{ManifestEntry, RemotePath};

use crate::backend::StorageBackend;
use crate::error::{manifest_err, SyncError};
use crate::manifest::ManifestStore;
use crate::observer::{SyncEvent, SyncObserver};

/// A storage removal that failed for a reason other than "already absent".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveFailure {
    pub remote_path: RemotePath,
    pub cause: String,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Orphans removed from storage and the manifest.
    pub removed: Vec<RemotePath>,
    /// Orphans already gone from storage; forgotten from the manifest.
    pub already_absent: Vec<RemotePath>,
    /// Orphans whose removal failed; forgotten from the manifest anyway.
    pub remove_failures: Vec<RemoveFailure>,
}

impl ReconcileReport {
    pub fn orphan_count(&self) -> usize {
        self.removed.len() + self.already_absent.len() + self.remove_failures.len()
    }
}

enum RemoveOutcome {
    Removed,
    AlreadyAbsent,
    Failed(String),
}

/// Remove every orphan under `namespace` with at most `concurrency` orphans
/// in flight.
///
/// Removal failures are reported, never fatal. A manifest delete failure is
/// fatal, but only after every orphan has been attempted.
pub async fn reconcile(
    storage: &dyn StorageBackend,
    manifest: &ManifestStore,
    observer: &dyn SyncObserver,
    namespace: &RemotePath,
    survive: &HashSet<RemotePath>,
    concurrency: usize,
) -> Result<ReconcileReport, SyncError> {
    let namespace = namespace.normalized_namespace();
    let orphans = manifest
        .find_under_prefix(&namespace, survive)
        .await
        .map_err(|e| manifest_err("query", namespace.prefix_boundary(), e))?;

    tracing::debug!(namespace = %namespace, orphans = orphans.len(), "reconciling");

    let results: Vec<_> = stream::iter(orphans)
        .map(move |ManifestEntry { remote_path }| async move {
            let outcome = match storage.remove(&remote_path).await {
                Ok(()) => RemoveOutcome::Removed,
                Err(e) if e.is_not_found() => {
                    observer.on_event(&SyncEvent::AlreadyAbsent {
                        remote_path: remote_path.clone(),
                        cause: e.to_string(),
                    });
                    RemoveOutcome::AlreadyAbsent
                }
                Err(e) => {
                    observer.on_event(&SyncEvent::RemoveFailed {
                        remote_path: remote_path.clone(),
                        cause: e.to_string(),
                    });
                    RemoveOutcome::Failed(e.to_string())
                }
            };
            let forgotten = manifest.forget(&remote_path).await;
            if forgotten.is_ok() {
                observer.on_event(&SyncEvent::Forgotten {
                    remote_path: remote_path.clone(),
                });
            }
            (remote_path, outcome, forgotten)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = ReconcileReport::default();
    let mut first_err = None;
    for (remote_path, outcome, forgotten) in results {
        if let Err(e) = forgotten {
            tracing::error!(remote = %remote_path, error = %e, "manifest delete failed");
            if first_err.is_none() {
                first_err = Some(manifest_err("delete", &remote_path, e));
            }
        }
        match outcome {
            RemoveOutcome::Removed => report.removed.push(remote_path),
            RemoveOutcome::AlreadyAbsent => report.already_absent.push(remote_path),
            RemoveOutcome::Failed(cause) => report.remove_failures.push(RemoveFailure {
                remote_path,
                cause,
            }),
        }
    }

    if let Some(err) = first_err {
        return Err(err);
    }
    report.removed.sort();
    report.already_absent.sort();
    report
        .remove_failures
        .sort_by(|a, b| a.remote_path.cmp(&b.remote_path));
    Ok(report)
}
