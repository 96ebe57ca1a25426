//! Local tree enumeration: every regular file below a root becomes a
//! [`CopyTask`] whose remote path mirrors its relative location.
//!
//! Symlinks are skipped unless `follow_symlinks` is set, in which case they
//! are always followed (and a broken or looping link fails the walk).
//! Any walk error aborts enumeration; a partial list is never returned.

use std::path::{Component, Path};

use walkdir::WalkDir;

use cloudstatic_core::{CopyTask, RemotePath};

use crate::error::{enum_err, SyncError};

/// Enumerate `local_root` into copy tasks under `namespace`.
///
/// Blocking; callers on an async runtime should use `spawn_blocking`.
pub fn enumerate(
    local_root: &Path,
    namespace: &RemotePath,
    follow_symlinks: bool,
) -> Result<Vec<CopyTask>, SyncError> {
    let root = std::fs::canonicalize(local_root).map_err(|e| enum_err(local_root, e))?;
    let meta = std::fs::metadata(&root).map_err(|e| enum_err(&root, e))?;
    if !meta.is_dir() {
        return Err(enum_err(
            &root,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let namespace = namespace.normalized_namespace();
    let mut tasks = Vec::new();

    for entry in WalkDir::new(&root).min_depth(1).follow_links(follow_symlinks) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&root).to_path_buf();
            enum_err(path, e.into())
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            tracing::debug!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&root)
            .map_err(|_| enum_err(entry.path(), std::io::Error::other("outside sync root")))?;
        let remote_path = remote_path_for(&namespace, relative)
            .ok_or_else(|| {
                enum_err(
                    entry.path(),
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "file name is not valid UTF-8",
                    ),
                )
            })?;

        tasks.push(CopyTask {
            local_path: entry.into_path(),
            remote_path,
        });
    }

    tracing::debug!(root = %root.display(), files = tasks.len(), "enumerated local tree");
    Ok(tasks)
}

/// `namespace` + `/` + relative components joined by `/`.
///
/// Returns `None` if a component is not valid UTF-8.
fn remote_path_for(namespace: &RemotePath, relative: &Path) -> Option<RemotePath> {
    let mut remote = namespace.clone();
    for component in relative.components() {
        if let Component::Normal(name) = component {
            remote = remote.join(name.to_str()?);
        }
    }
    Some(remote)
}
