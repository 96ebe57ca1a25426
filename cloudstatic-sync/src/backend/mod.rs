//! Collaborator interfaces consumed by the engine, and bundled implementations.
//!
//! The engine never touches storage or the document store directly; it only
//! calls the two traits below.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;

use cloudstatic_core::{ManifestEntry, ManifestError, RemotePath, StorageError};

pub mod json;
pub mod local;
pub mod memory;

pub use json::JsonManifestBackend;
pub use local::LocalStorage;
pub use memory::{MemoryManifest, MemoryStorage};

/// Object storage: the remote namespace files are synced into.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Copy a local file to `remote_path`, replacing any existing object.
    async fn copy_in(&self, local_path: &Path, remote_path: &RemotePath)
        -> Result<(), StorageError>;

    /// Remove the object at `remote_path`.
    ///
    /// Must return [`StorageError::NotFound`] when the object is already absent.
    async fn remove(&self, remote_path: &RemotePath) -> Result<(), StorageError>;

    /// Public base URL; callers append a remote path to it.
    fn get_url(&self) -> String;
}

/// Document store holding manifest records, keyed by remote path.
#[async_trait]
pub trait ManifestBackend: Send + Sync {
    /// Prepare `collection` for use. Called once at init.
    async fn ensure_collection(&self, _collection: &str) -> Result<(), ManifestError> {
        Ok(())
    }

    /// Insert or refresh a record. Idempotent.
    async fn upsert(&self, collection: &str, entry: &ManifestEntry) -> Result<(), ManifestError>;

    /// Records whose key starts with the literal string `prefix` and is not
    /// in `exclude`.
    async fn find_by_prefix_excluding(
        &self,
        collection: &str,
        prefix: &str,
        exclude: &HashSet<RemotePath>,
    ) -> Result<Vec<ManifestEntry>, ManifestError>;

    /// Delete a record. Deleting an absent key is not an error.
    async fn delete_by_key(&self, collection: &str, key: &RemotePath)
        -> Result<(), ManifestError>;
}
