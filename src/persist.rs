//! Whole-file persistence with atomic replace
//!
//! Files are written to a uniquely named sibling temp file, synced, then
//! persisted over the target so readers never observe a partial document.
//! Concurrent writers each get their own temp file; the last rename wins.

use crate::error::{CaskhashError, CaskhashResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

/// Read a file, returning `None` if it does not exist
pub async fn read_optional(path: &Path) -> CaskhashResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CaskhashError::io(format!("reading {}", path.display()), e)),
    }
}

/// Replace `path` with `contents` atomically
pub async fn write_atomic(path: &Path, contents: &[u8]) -> CaskhashResult<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| CaskhashError::io(format!("creating directory {}", dir.display()), e))?;

    let target = path.to_path_buf();
    let bytes = contents.to_vec();
    tokio::task::spawn_blocking(move || persist_blocking(&dir, &target, &bytes))
        .await
        .map_err(|e| CaskhashError::Internal(format!("persist task failed: {}", e)))?
}

/// The temp file lives next to the target so the rename stays on one filesystem
fn persist_blocking(dir: &Path, path: &Path, contents: &[u8]) -> CaskhashResult<()> {
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| CaskhashError::io(format!("creating temp file in {}", dir.display()), e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| CaskhashError::io(format!("writing {}", tmp.path().display()), e))?;

    // On failure the returned NamedTempFile is dropped, which deletes it
    tmp.persist(path)
        .map_err(|e| CaskhashError::io(format!("replacing {}", path.display()), e.error))?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Whether two paths name the same file, resolving symlinks and relative
/// forms where the parent directory exists
pub fn same_target(a: &Path, b: &Path) -> bool {
    a == b || resolve(a).zip(resolve(b)).is_some_and(|(a, b)| a == b)
}

fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(full) = std::fs::canonicalize(path) {
        return Some(full);
    }
    let name = path.file_name()?;
    std::fs::canonicalize(parent_dir(path))
        .ok()
        .map(|dir| dir.join(name))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
