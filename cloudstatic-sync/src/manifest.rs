//! Manifest store: which remote paths a sync currently owns.
//!
//! A thin wrapper over a [`ManifestBackend`] collection. Nothing is cached;
//! every call goes to the backend.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use cloudstatic_core::{ManifestEntry, ManifestError, RemotePath};

use crate::backend::ManifestBackend;
use crate::error::{manifest_err, SyncError};
use crate::observer::{SyncEvent, SyncObserver};

#[derive(Clone)]
pub struct ManifestStore {
    backend: Arc<dyn ManifestBackend>,
    collection: String,
}

impl ManifestStore {
    pub fn new(backend: Arc<dyn ManifestBackend>, collection: impl Into<String>) -> Self {
        Self {
            backend,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub(crate) async fn ensure_collection(&self) -> Result<(), ManifestError> {
        self.backend.ensure_collection(&self.collection).await
    }

    /// Assert that `remote_path` is ours. Idempotent.
    pub async fn record_success(&self, remote_path: &RemotePath) -> Result<(), ManifestError> {
        self.backend
            .upsert(&self.collection, &ManifestEntry::from(remote_path.clone()))
            .await
    }

    /// Entries strictly below `namespace` that are not in `exclude`.
    ///
    /// `/foo` matches `/foo/x` but never `/foobar/y`.
    pub async fn find_under_prefix(
        &self,
        namespace: &RemotePath,
        exclude: &HashSet<RemotePath>,
    ) -> Result<Vec<ManifestEntry>, ManifestError> {
        let prefix = namespace.prefix_boundary();
        self.backend
            .find_by_prefix_excluding(&self.collection, &prefix, exclude)
            .await
    }

    /// Delete the entry for `remote_path`. Absent entries are not an error.
    pub async fn forget(&self, remote_path: &RemotePath) -> Result<(), ManifestError> {
        self.backend.delete_by_key(&self.collection, remote_path).await
    }

    /// Record every path with at most `concurrency` upserts in flight.
    ///
    /// All upserts are attempted; the first failure is returned.
    pub async fn record_all(
        &self,
        paths: &[RemotePath],
        concurrency: usize,
        observer: &dyn SyncObserver,
    ) -> Result<(), SyncError> {
        let results: Vec<(&RemotePath, Result<(), ManifestError>)> = stream::iter(paths)
            .map(move |path| async move { (path, self.record_success(path).await) })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut first_err = None;
        for (path, result) in results {
            match result {
                Ok(()) => observer.on_event(&SyncEvent::Recorded {
                    remote_path: path.clone(),
                }),
                Err(e) => {
                    tracing::error!(remote = %path, error = %e, "manifest upsert failed");
                    if first_err.is_none() {
                        first_err = Some(manifest_err("upsert", path, e));
                    }
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
