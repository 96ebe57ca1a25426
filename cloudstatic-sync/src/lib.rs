//! # cloudstatic-sync
//!
//! Sync a local directory tree into object storage and keep a manifest of
//! what was uploaded, so later syncs can delete remote objects that no longer
//! have a local counterpart.
//!
//! Build a [`CloudStatic`] handle from a storage backend and a manifest
//! backend, then call [`CloudStatic::sync_folder`],
//! [`CloudStatic::remove_folder`], or [`CloudStatic::get_url`].

pub mod backend;
pub mod engine;
pub mod enumerate;
pub mod error;
pub mod manifest;
pub mod observer;
pub mod reconcile;
pub mod transfer;

pub use backend::{
    JsonManifestBackend, LocalStorage, ManifestBackend, MemoryManifest, MemoryStorage,
    StorageBackend,
};
pub use engine::{CloudStatic, CloudStaticBuilder, SyncOptions, SyncReport};
pub use error::SyncError;
pub use manifest::ManifestStore;
pub use observer::{RecordingObserver, SyncEvent, SyncObserver, TracingObserver};
pub use reconcile::{ReconcileReport, RemoveFailure};
