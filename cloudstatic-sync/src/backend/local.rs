//! Local-disk storage backend.
//!
//! Objects live under `root`, one file per remote path. Writes go to a
//! uniquely named `.cloudstatic.tmp` sibling first and are renamed into
//! place, so a reader never observes a partially copied object.
//!
//! Directories are an artefact of the layout, not objects: removing the
//! last object below a directory removes the directory too, up to `root`.
//! Otherwise a remote path that was once a directory could never become an
//! object again.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use cloudstatic_core::{RemotePath, StorageError};

use super::StorageBackend;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a remote path onto a file below `root`.
    ///
    /// Only normal segments are accepted; `.` and `..` would escape the
    /// namespace.
    pub fn object_path(&self, remote_path: &RemotePath) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        let mut segments = 0usize;
        for segment in remote_path.as_str().split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." || segment.contains('\\') {
                return Err(StorageError::InvalidPath {
                    path: remote_path.to_string(),
                    reason: "relative or non-portable segment",
                });
            }
            path.push(segment);
            segments += 1;
        }
        if segments == 0 {
            return Err(StorageError::InvalidPath {
                path: remote_path.to_string(),
                reason: "no object name",
            });
        }
        Ok(path)
    }

    /// A sibling of `dest` no other in-flight copy in this or another
    /// process will pick.
    fn tmp_path(dest: &Path) -> PathBuf {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        PathBuf::from(format!(
            "{}.{}-{n}.cloudstatic.tmp",
            dest.display(),
            std::process::id()
        ))
    }

    /// Remove now-empty directories from `dir` upward, stopping at `root` or
    /// at the first directory that still holds something.
    async fn prune_empty_parents(&self, mut dir: Option<&Path>) {
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            match tokio::fs::remove_dir(current).await {
                Ok(()) => {
                    tracing::debug!(dir = %current.display(), "pruned empty directory");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                // Not empty, or not ours to remove.
                Err(_) => break,
            }
            dir = current.parent();
        }
    }
}

async fn discard_tmp(tmp: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(tmp = %tmp.display(), error = %e, "failed to remove temp file");
        }
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn copy_in(
        &self,
        local_path: &Path,
        remote_path: &RemotePath,
    ) -> Result<(), StorageError> {
        let dest = self.object_path(remote_path)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }

        // A leftover empty directory at `dest` would make the rename fail.
        if tokio::fs::metadata(&dest).await.is_ok_and(|m| m.is_dir()) {
            match tokio::fs::remove_dir(&dest).await {
                Ok(()) => tracing::debug!(dest = %dest.display(), "replaced empty directory"),
                Err(e) => return Err(io_err(&dest, e)),
            }
        }

        let tmp = Self::tmp_path(&dest);
        if let Err(e) = tokio::fs::copy(local_path, &tmp).await {
            discard_tmp(&tmp).await;
            return Err(io_err(local_path, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp, &dest).await {
            discard_tmp(&tmp).await;
            return Err(io_err(&dest, e));
        }

        tracing::debug!(remote = %remote_path, dest = %dest.display(), "stored object");
        Ok(())
    }

    async fn remove(&self, remote_path: &RemotePath) -> Result<(), StorageError> {
        let dest = self.object_path(remote_path)?;
        match tokio::fs::remove_file(&dest).await {
            Ok(()) => {
                self.prune_empty_parents(dest.parent()).await;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound {
                path: remote_path.to_string(),
            }),
            Err(e) => Err(io_err(&dest, e)),
        }
    }

    fn get_url(&self) -> String {
        self.base_url.clone()
    }
}

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.into(),
        source,
    }
}
