//! Structured sync events and the observer hook that receives them.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use cloudstatic_core::RemotePath;

/// One notable step of a sync or removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A file was copied into storage.
    Copied { remote_path: RemotePath },
    /// A manifest entry was upserted.
    Recorded { remote_path: RemotePath },
    /// An orphan's object was already gone. Tolerated.
    AlreadyAbsent { remote_path: RemotePath, cause: String },
    /// An orphan's object could not be removed for another reason. The
    /// manifest entry is forgotten regardless.
    RemoveFailed { remote_path: RemotePath, cause: String },
    /// A manifest entry was deleted.
    Forgotten { remote_path: RemotePath },
}

pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

/// Default observer: every event becomes a `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Copied { remote_path } => tracing::debug!(remote = %remote_path, "copied"),
            SyncEvent::Recorded { remote_path } => {
                tracing::debug!(remote = %remote_path, "recorded in manifest")
            }
            SyncEvent::AlreadyAbsent { remote_path, cause } => tracing::warn!(
                remote = %remote_path,
                cause = %cause,
                "object most likely already gone from storage",
            ),
            SyncEvent::RemoveFailed { remote_path, cause } => tracing::warn!(
                remote = %remote_path,
                cause = %cause,
                "failed to remove object from storage; forgetting it anyway",
            ),
            SyncEvent::Forgotten { remote_path } => {
                tracing::debug!(remote = %remote_path, "forgotten from manifest")
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
