//! The `CloudStatic` handle: sync a local folder into storage, purge a
//! previously synced folder, and resolve public URLs.
//!
//! ## `sync_folder` phases
//!
//! 1. Enumerate the local tree (fatal on any walk error).
//! 2. Copy every file, bounded by `concurrency`.
//! 3. Upsert a manifest entry for every copied path, bounded by `concurrency`.
//! 4. Reconcile: purge manifest entries under the namespace that were not
//!    just copied.
//!
//! If any copy fails, the paths that did copy are still recorded (step 3)
//! so the manifest never lags behind storage, but step 4 is skipped: a
//! truncated survive set could purge objects that are still needed.
//!
//! Concurrent syncs into overlapping namespaces are not serialised here.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use cloudstatic_core::{Config, RemotePath, DEFAULT_COLLECTION, DEFAULT_CONCURRENCY};

use crate::backend::{JsonManifestBackend, LocalStorage, ManifestBackend, StorageBackend};
use crate::enumerate::enumerate;
use crate::error::{manifest_err, SyncError};
use crate::manifest::ManifestStore;
use crate::observer::{SyncObserver, TracingObserver};
use crate::reconcile::{reconcile, ReconcileReport};
use crate::transfer::transfer_all;

// ---------------------------------------------------------------------------
// Options and reports
// ---------------------------------------------------------------------------

/// Tunables shared by every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Maximum in-flight operations per phase (copy, upsert, reconcile).
    pub concurrency: usize,
    /// Follow symlinks while enumerating instead of skipping them.
    pub follow_symlinks: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            follow_symlinks: false,
        }
    }
}

/// Outcome of a successful `sync_folder`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub namespace: RemotePath,
    /// Remote paths copied and recorded, sorted.
    pub copied: Vec<RemotePath>,
    pub reconcile: ReconcileReport,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CloudStaticBuilder {
    storage: Option<Arc<dyn StorageBackend>>,
    manifest: Option<Arc<dyn ManifestBackend>>,
    collection: Option<String>,
    observer: Option<Arc<dyn SyncObserver>>,
    options: SyncOptions,
}

impl CloudStaticBuilder {
    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn manifest(mut self, manifest: Arc<dyn ManifestBackend>) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Manifest collection name. Defaults to `cloudStatic`.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Receiver for structured events. Defaults to [`TracingObserver`].
    pub fn observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the collaborators and prepare the manifest collection.
    ///
    /// Nothing is returned unless every required piece is present.
    pub async fn init(self) -> Result<CloudStatic, SyncError> {
        let storage = self.storage.ok_or(SyncError::Configuration(
            "storage backend not given; a storage backend must be supplied",
        ))?;
        let manifest = self.manifest.ok_or(SyncError::Configuration(
            "manifest backend not given; a manifest backend must be supplied",
        ))?;
        if self.options.concurrency == 0 {
            return Err(SyncError::Configuration("concurrency must be at least 1"));
        }
        let collection = self
            .collection
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_owned());
        if collection.trim().is_empty() {
            return Err(SyncError::Configuration("collection name must not be empty"));
        }

        let manifest = ManifestStore::new(manifest, collection);
        manifest
            .ensure_collection()
            .await
            .map_err(|e| manifest_err("init", manifest.collection(), e))?;

        Ok(CloudStatic {
            storage,
            manifest,
            observer: self
                .observer
                .unwrap_or_else(|| Arc::new(TracingObserver) as Arc<dyn SyncObserver>),
            options: self.options,
        })
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// An initialised sync engine. Cheap to clone; clones share collaborators.
#[derive(Clone)]
pub struct CloudStatic {
    storage: Arc<dyn StorageBackend>,
    manifest: ManifestStore,
    observer: Arc<dyn SyncObserver>,
    options: SyncOptions,
}

impl CloudStatic {
    pub fn builder() -> CloudStaticBuilder {
        CloudStaticBuilder::default()
    }

    /// Initialise with default options. `collection` defaults to `cloudStatic`.
    pub async fn init(
        storage: Arc<dyn StorageBackend>,
        manifest: Arc<dyn ManifestBackend>,
        collection: Option<&str>,
    ) -> Result<Self, SyncError> {
        let mut builder = Self::builder().storage(storage).manifest(manifest);
        if let Some(collection) = collection {
            builder = builder.collection(collection);
        }
        builder.init().await
    }

    /// Build a handle from a loaded config: local-disk storage plus the
    /// JSON-file manifest.
    pub async fn from_config(config: &Config) -> Result<Self, SyncError> {
        Self::builder()
            .storage(Arc::new(LocalStorage::new(
                &config.storage.root,
                &config.storage.base_url,
            )))
            .manifest(Arc::new(JsonManifestBackend::new(&config.manifest.dir)))
            .collection(&config.manifest.collection)
            .options(SyncOptions {
                concurrency: config.concurrency,
                follow_symlinks: config.follow_symlinks,
            })
            .init()
            .await
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    pub fn manifest(&self) -> &ManifestStore {
        &self.manifest
    }

    /// Sync `local_folder` into `remote_namespace`, then delete every object
    /// previously synced under that namespace that no longer exists locally.
    pub async fn sync_folder(
        &self,
        local_folder: impl AsRef<Path>,
        remote_namespace: impl Into<RemotePath>,
    ) -> Result<SyncReport, SyncError> {
        let namespace = remote_namespace.into().normalized_namespace();
        let local = local_folder.as_ref().to_path_buf();

        let tasks = {
            let namespace = namespace.clone();
            let follow = self.options.follow_symlinks;
            tokio::task::spawn_blocking(move || enumerate(&local, &namespace, follow))
                .await
                .map_err(|e| SyncError::Task(format!("enumeration task: {e}")))??
        };
        let total = tasks.len();
        tracing::info!(namespace = %namespace, files = total, "syncing folder");

        let outcome = transfer_all(
            self.storage.as_ref(),
            self.observer.as_ref(),
            tasks,
            self.options.concurrency,
        )
        .await;

        let mut copied = outcome.copied;
        copied.sort();
        self.manifest
            .record_all(&copied, self.options.concurrency, self.observer.as_ref())
            .await?;

        let failed = outcome.failures.len();
        if let Some(first) = outcome.failures.into_iter().next() {
            tracing::error!(
                namespace = %namespace,
                failed,
                total,
                "sync incomplete; skipping reconciliation",
            );
            return Err(SyncError::Transfer {
                local: first.task.local_path,
                remote: first.task.remote_path,
                failed,
                total,
                source: first.error,
            });
        }

        let survive: HashSet<RemotePath> = copied.iter().cloned().collect();
        let reconcile = self.reconcile(&namespace, &survive).await?;

        tracing::info!(
            namespace = %namespace,
            copied = copied.len(),
            removed = reconcile.orphan_count(),
            "sync completed",
        );
        Ok(SyncReport {
            namespace,
            copied,
            reconcile,
        })
    }

    /// Delete everything previously synced under `remote_namespace` except
    /// the paths in `except`, from storage and from the manifest.
    pub async fn remove_folder(
        &self,
        remote_namespace: impl Into<RemotePath>,
        except: &[RemotePath],
    ) -> Result<ReconcileReport, SyncError> {
        let namespace = remote_namespace.into().normalized_namespace();
        let survive: HashSet<RemotePath> = except.iter().cloned().collect();
        let report = self.reconcile(&namespace, &survive).await?;
        tracing::info!(
            namespace = %namespace,
            removed = report.orphan_count(),
            kept = except.len(),
            "folder removed",
        );
        Ok(report)
    }

    /// Public URL for `remote_path`: the storage base URL with the path
    /// appended verbatim.
    pub fn get_url(&self, remote_path: &str) -> String {
        format!("{}{}", self.storage.get_url(), remote_path)
    }

    async fn reconcile(
        &self,
        namespace: &RemotePath,
        survive: &HashSet<RemotePath>,
    ) -> Result<ReconcileReport, SyncError> {
        reconcile(
            self.storage.as_ref(),
            &self.manifest,
            self.observer.as_ref(),
            namespace,
            survive,
            self.options.concurrency,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
