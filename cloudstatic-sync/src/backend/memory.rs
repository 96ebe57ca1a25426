//! In-process storage and document store.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use cloudstatic_core::{ManifestEntry, ManifestError, RemotePath, StorageError};

use super::{ManifestBackend, StorageBackend};

/// Object bytes keyed by remote path.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    base_url: String,
    objects: Mutex<BTreeMap<RemotePath, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, remote_path: &RemotePath) -> Option<Vec<u8>> {
        self.objects().get(remote_path).cloned()
    }

    pub fn paths(&self) -> Vec<RemotePath> {
        self.objects().keys().cloned().collect()
    }

    /// Place an object directly, bypassing `copy_in`.
    pub fn insert(&self, remote_path: RemotePath, bytes: impl Into<Vec<u8>>) {
        self.objects().insert(remote_path, bytes.into());
    }

    /// Drop an object directly, bypassing `remove`.
    pub fn evict(&self, remote_path: &RemotePath) -> bool {
        self.objects().remove(remote_path).is_some()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<RemotePath, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn copy_in(
        &self,
        local_path: &Path,
        remote_path: &RemotePath,
    ) -> Result<(), StorageError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| StorageError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;
        self.objects().insert(remote_path.clone(), bytes);
        Ok(())
    }

    async fn remove(&self, remote_path: &RemotePath) -> Result<(), StorageError> {
        match self.objects().remove(remote_path) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound {
                path: remote_path.to_string(),
            }),
        }
    }

    fn get_url(&self) -> String {
        self.base_url.clone()
    }
}

/// Manifest records per collection.
#[derive(Debug, Default)]
pub struct MemoryManifest {
    collections: Mutex<HashMap<String, BTreeSet<RemotePath>>>,
}

impl MemoryManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted keys currently recorded in `collection`.
    pub fn entries(&self, collection: &str) -> Vec<RemotePath> {
        self.collections()
            .get(collection)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn insert(&self, collection: &str, remote_path: RemotePath) {
        self.collections()
            .entry(collection.to_owned())
            .or_default()
            .insert(remote_path);
    }

    fn collections(&self) -> MutexGuard<'_, HashMap<String, BTreeSet<RemotePath>>> {
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ManifestBackend for MemoryManifest {
    async fn upsert(&self, collection: &str, entry: &ManifestEntry) -> Result<(), ManifestError> {
        self.insert(collection, entry.remote_path.clone());
        Ok(())
    }

    async fn find_by_prefix_excluding(
        &self,
        collection: &str,
        prefix: &str,
        exclude: &HashSet<RemotePath>,
    ) -> Result<Vec<ManifestEntry>, ManifestError> {
        Ok(self
            .collections()
            .get(collection)
            .map(|set| {
                set.iter()
                    .filter(|p| p.as_str().starts_with(prefix) && !exclude.contains(*p))
                    .cloned()
                    .map(ManifestEntry::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_by_key(
        &self,
        collection: &str,
        key: &RemotePath,
    ) -> Result<(), ManifestError> {
        if let Some(set) = self.collections().get_mut(collection) {
            set.remove(key);
        }
        Ok(())
    }
}
