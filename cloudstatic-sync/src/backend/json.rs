//! JSON-file document store for manifest records.
//!
//! Persists one `CollectionFile` JSON document per collection at
//! `<dir>/<collection>.json`. Writes use an atomic `.tmp` + rename.
//!
//! Each collection is read from disk once per backend and then served from
//! an in-process cache held under a mutex, so upserts and deletes are atomic
//! with respect to each other. Every change still rewrites the whole file;
//! this store suits manifests of thousands of entries, not millions. A
//! process sharing the directory with another writer must not hold a
//! backend across the other's writes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use cloudstatic_core::{ManifestEntry, ManifestError, RemotePath};

use super::ManifestBackend;

/// On-disk collection payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionFile {
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub entries: BTreeSet<ManifestEntry>,
}

#[derive(Debug)]
pub struct JsonManifestBackend {
    dir: PathBuf,
    cache: Mutex<HashMap<String, CollectionFile>>,
}

impl JsonManifestBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// `<dir>/<collection>.json`
    pub fn collection_path(&self, collection: &str) -> Result<PathBuf, ManifestError> {
        if collection.is_empty()
            || collection.starts_with('.')
            || collection.contains(['/', '\\'])
        {
            return Err(ManifestError::Backend(format!(
                "invalid collection name '{collection}'"
            )));
        }
        Ok(self.dir.join(format!("{collection}.json")))
    }

    /// Load a collection from disk, bypassing the cache. A missing file is an
    /// empty collection.
    pub async fn load(&self, collection: &str) -> Result<CollectionFile, ManifestError> {
        let path = self.collection_path(collection)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(CollectionFile {
                    updated_at: Utc::now(),
                    entries: BTreeSet::new(),
                })
            }
            Err(e) => return Err(io_err(&path, e)),
        };
        serde_json::from_str(&contents).map_err(|source| ManifestError::Json { path, source })
    }

    /// Take `collection` out of the cache, loading it on first use. Callers
    /// put it back once any write has succeeded; a failed write drops it so
    /// the next call reloads from disk.
    async fn take(
        &self,
        cache: &mut HashMap<String, CollectionFile>,
        collection: &str,
    ) -> Result<CollectionFile, ManifestError> {
        match cache.remove(collection) {
            Some(file) => Ok(file),
            None => self.load(collection).await,
        }
    }

    async fn save(&self, collection: &str, file: &CollectionFile) -> Result<(), ManifestError> {
        let path = self.collection_path(collection)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err(&self.dir, e))?;

        let json = serde_json::to_string_pretty(file).map_err(|source| ManifestError::Json {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| io_err(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_err(&path, e))?;
        Ok(())
    }
}

#[async_trait]
impl ManifestBackend for JsonManifestBackend {
    async fn ensure_collection(&self, collection: &str) -> Result<(), ManifestError> {
        self.collection_path(collection)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err(&self.dir, e))
    }

    async fn upsert(&self, collection: &str, entry: &ManifestEntry) -> Result<(), ManifestError> {
        let mut cache = self.cache.lock().await;
        let mut file = self.take(&mut cache, collection).await?;
        if file.entries.insert(entry.clone()) {
            file.updated_at = Utc::now();
            self.save(collection, &file).await?;
        }
        cache.insert(collection.to_owned(), file);
        Ok(())
    }

    async fn find_by_prefix_excluding(
        &self,
        collection: &str,
        prefix: &str,
        exclude: &HashSet<RemotePath>,
    ) -> Result<Vec<ManifestEntry>, ManifestError> {
        let mut cache = self.cache.lock().await;
        let file = self.take(&mut cache, collection).await?;
        let found = file
            .entries
            .iter()
            .filter(|e| e.remote_path.as_str().starts_with(prefix))
            .filter(|e| !exclude.contains(&e.remote_path))
            .cloned()
            .collect();
        cache.insert(collection.to_owned(), file);
        Ok(found)
    }

    async fn delete_by_key(
        &self,
        collection: &str,
        key: &RemotePath,
    ) -> Result<(), ManifestError> {
        let mut cache = self.cache.lock().await;
        let mut file = self.take(&mut cache, collection).await?;
        let before = file.entries.len();
        file.entries.retain(|e| &e.remote_path != key);
        if file.entries.len() != before {
            file.updated_at = Utc::now();
            self.save(collection, &file).await?;
        }
        cache.insert(collection.to_owned(), file);
        Ok(())
    }
}

fn io_err(path: &Path, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.to_path_buf(),
        source,
    }
}
