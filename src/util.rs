use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::{PatchError, Result};

/// Compute the BLAKE3 hash of a byte slice.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash the current contents of a file with BLAKE3.
pub async fn hash_file(path: &Path) -> Result<[u8; 32]> {
    let data = tokio::fs::read(path)
        .await
        .map_err(PatchError::not_found("file to hash", path))?;
    Ok(hash_bytes(&data))
}

/// Write `data` to `path` and fsync it before returning.
pub async fn write_durable(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(PatchError::io("create file", path))?;
    file.write_all(data)
        .await
        .map_err(PatchError::io("write file", path))?;
    sync_file(&mut file, path).await
}

/// Copy `from` to `to` (permissions included) and fsync the copy.
pub async fn copy_durable(from: &Path, to: &Path) -> Result<u64> {
    let copied = tokio::fs::copy(from, to)
        .await
        .map_err(PatchError::io("copy file", to))?;
    // Read-only handle: the copy may carry read-only permissions.
    let mut file = tokio::fs::File::open(to)
        .await
        .map_err(PatchError::io("open copied file", to))?;
    sync_file(&mut file, to).await?;
    Ok(copied)
}

async fn sync_file(file: &mut tokio::fs::File, path: &Path) -> Result<()> {
    file.flush()
        .await
        .map_err(PatchError::io("flush file", path))?;
    file.sync_all()
        .await
        .map_err(PatchError::io("sync file", path))
}

/// Remove a file, logging instead of failing. A missing file counts as removed.
pub async fn remove_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "cleanup failed"),
    }
}

/// Whether `path` exists without following a trailing symlink.
pub async fn exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

/// Whether `path` itself is a symbolic link. A missing path is an error.
pub async fn is_symlink(path: &Path, what: &'static str) -> Result<bool> {
    let meta = tokio::fs::symlink_metadata(path)
        .await
        .map_err(PatchError::not_found(what, path))?;
    Ok(meta.file_type().is_symlink())
}

/// Hidden temp path next to `path`, so a later rename stays on one filesystem.
pub fn sibling_temp(path: &Path, tag: &str) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".{tag}.{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Atomically replace `dest` (file or symlink) with `temp`, removing `temp` on failure.
pub async fn replace_with(temp: &Path, dest: &Path) -> Result<()> {
    if let Err(e) = tokio::fs::rename(temp, dest).await {
        remove_best_effort(temp).await;
        return Err(PatchError::io("swap into place", dest)(e));
    }
    Ok(())
}

/// Create a symbolic link at `link` pointing to the file `target`.
pub async fn symlink_file(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let created = tokio::fs::symlink(target, link).await;
    #[cfg(windows)]
    let created = tokio::fs::symlink_file(target, link).await;
    created.map_err(PatchError::io("create symlink", link))
}

/// Read a file that must be text. Any failure, including invalid UTF-8, is `NotFound`.
pub async fn read_text(path: &Path, what: &'static str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(PatchError::not_found(what, path))
}
