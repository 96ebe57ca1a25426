//! Bounded-concurrency transfer of copy tasks into storage.
//!
//! A failed copy does not cancel the others: every task runs to completion
//! and the caller gets both the copied set and the failures.

use futures::stream::{self, StreamExt};

use cloudstatic_core::{CopyTask, RemotePath, StorageError};

use crate::backend::StorageBackend;
use crate::observer::{SyncEvent, SyncObserver};

/// A copy that did not make it into storage.
#[derive(Debug)]
pub struct TransferFailure {
    pub task: CopyTask,
    pub error: StorageError,
}

#[derive(Debug, Default)]
pub struct TransferOutcome {
    /// Remote paths that now hold the local file's content.
    pub copied: Vec<RemotePath>,
    pub failures: Vec<TransferFailure>,
}

/// Copy every task with at most `concurrency` copies in flight.
pub async fn transfer_all(
    storage: &dyn StorageBackend,
    observer: &dyn SyncObserver,
    tasks: Vec<CopyTask>,
    concurrency: usize,
) -> TransferOutcome {
    let results: Vec<(CopyTask, Result<(), StorageError>)> = stream::iter(tasks)
        .map(move |task| async move {
            let result = storage.copy_in(&task.local_path, &task.remote_path).await;
            (task, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = TransferOutcome::default();
    for (task, result) in results {
        match result {
            Ok(()) => {
                observer.on_event(&SyncEvent::Copied {
                    remote_path: task.remote_path.clone(),
                });
                outcome.copied.push(task.remote_path);
            }
            Err(error) => {
                tracing::error!(
                    local = %task.local_path.display(),
                    remote = %task.remote_path,
                    error = %error,
                    "transfer failed",
                );
                outcome.failures.push(TransferFailure { task, error });
            }
        }
    }
    outcome
}
