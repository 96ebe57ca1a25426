//! Domain types shared by the engine, its collaborators, and the CLI.
//!
//! Local filesystem locations use `PathBuf`. Remote locations are
//! [`RemotePath`] values: `/`-separated keys in the storage namespace,
//! independent of the host platform's separator.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A key in the remote storage namespace, e.g. `/site/subdir/nested.txt`.
///
/// This is also the identity of a manifest entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemotePath(pub String);

impl RemotePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append one `/`-separated segment.
    pub fn join(&self, segment: &str) -> RemotePath {
        RemotePath(format!("{}/{}", self.0, segment))
    }

    /// Trim trailing `/` so `/site/` and `/site` name the same namespace.
    ///
    /// The root namespace normalises to the empty string.
    pub fn normalized_namespace(&self) -> RemotePath {
        RemotePath(self.0.trim_end_matches('/').to_owned())
    }

    /// The literal boundary used for prefix queries: the namespace plus a
    /// trailing separator, so `/foo` never matches `/foobar/x`.
    pub fn prefix_boundary(&self) -> String {
        format!("{}/", self.normalized_namespace().0)
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemotePath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemotePath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for RemotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One file to transfer. Produced by enumeration, consumed by the transfer
/// phase, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    /// Absolute path of the source file on local disk.
    pub local_path: PathBuf,
    pub remote_path: RemotePath,
}

/// A remote object believed to exist because a sync put it there.
///
/// The remote path is the only field: the manifest records ownership, not
/// provenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub remote_path: RemotePath,
}

impl From<RemotePath> for ManifestEntry {
    fn from(remote_path: RemotePath) -> Self {
        Self { remote_path }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
