//! Atomic JSON persistence: write temp -> fsync -> rename.
//!
//! # INVARIANT
//! The canonical path only ever holds a complete document. The temp file is
//! created next to the target so the final rename stays on one filesystem.

use crate::error::{StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
/// Parent directories are created as needed.
pub fn atomic_write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut bytes = serde_json::to_vec_pretty(value).map_err(StorageError::Serialize)?;
    bytes.push(b'\n');

    // Dropping the NamedTempFile on any early return removes the temp file.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    sync_dir(dir);
    Ok(())
}

/// Read and decode a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let content = fs::read(path)?;
    serde_json::from_slice(&content).map_err(|source| StorageError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_json`], but a missing file yields `None` instead of an error.
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    match read_json(path) {
        Ok(v) => Ok(Some(v)),
        Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    // Makes the rename itself durable. Not every filesystem allows it.
    if let Ok(d) = fs::File::open(dir) {
        if let Err(e) = d.sync_all() {
            tracing::debug!("directory fsync skipped for {}: {}", dir.display(), e);
        }
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
