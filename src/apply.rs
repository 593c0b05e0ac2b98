use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{PatchError, Result};
use crate::hunk_apply;
use crate::patch_format;
use crate::store::{PatchStore, RecordPaths};
use crate::util;

#[derive(Debug)]
pub struct ApplySummary {
    pub name: String,
    pub hunks: usize,
    /// File the live path now links to.
    pub patched: PathBuf,
    pub backup: PathBuf,
}

#[derive(Debug)]
pub enum RevertOutcome {
    Restored { name: String, bytes: u64 },
    /// The live path was a regular file already; nothing was touched.
    NotApplied,
}

/// Apply the committed patch to the live file's current content and swap the
/// live path for a symlink to the result.
///
/// The patched result and the backup are written and synced before the live
/// path is touched; the swap itself is a single rename of a prepared symlink.
/// Concurrent invocations on the same file are not guarded against.
pub async fn apply_patch(config: &Config, file: &Path) -> Result<ApplySummary> {
    let store = PatchStore::new(&config.store_root);
    let record = store.record_for(file)?;

    // Stage 1: preconditions
    if !util::exists(&record.patch).await {
        return Err(PatchError::missing("patch to apply", &record.patch));
    }
    if util::is_symlink(file, "live file").await? {
        return Err(PatchError::AlreadyApplied {
            path: file.to_path_buf(),
        });
    }

    // Stage 2: compute the result in memory; nothing on disk changes on conflict
    let live_bytes = tokio::fs::read(file)
        .await
        .map_err(PatchError::not_found("live file", file))?;
    let live_text = std::str::from_utf8(&live_bytes).map_err(|e| PatchError::NotFound {
        what: "live file text",
        path: file.to_path_buf(),
        source: Some(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
    })?;
    let patch_text = util::read_text(&record.patch, "patch").await?;
    let patch = patch_format::parse(&patch_text);
    if let Some(label) = patch.name.as_deref().filter(|label| *label != record.name) {
        tracing::warn!(name = %record.name, label, "patch header names a different file");
    }

    let patched = hunk_apply::apply(live_text, &patch, config.fuzz).map_err(|rejected| {
        PatchError::ApplyConflict {
            name: record.name.clone(),
            hunk: rejected.hunk,
            line: rejected.line,
        }
    })?;
    tracing::debug!(name = %record.name, hunks = patch.hunks.len(), fuzz = config.fuzz, "patch matched");

    // Stage 3: persist result and backup
    util::write_durable(&record.patched, patched.as_bytes()).await?;
    util::copy_durable(file, &record.backup).await?;
    verify_backup(&record, file, &live_bytes).await?;

    // Stage 4: swap the live path for a symlink
    let target = tokio::fs::canonicalize(&record.patched)
        .await
        .map_err(PatchError::io("resolve patched file", &record.patched))?;
    let temp_link = util::sibling_temp(file, "link");
    util::remove_best_effort(&temp_link).await;
    util::symlink_file(&target, &temp_link).await?;
    util::replace_with(&temp_link, file).await?;

    tracing::info!(name = %record.name, target = %target.display(), "applied");
    Ok(ApplySummary {
        name: record.name,
        hunks: patch.hunks.len(),
        patched: target,
        backup: record.backup,
    })
}

/// Compare the backup just written against the bytes the patch was matched
/// with. On a mismatch the live file moved underneath us: the result and the
/// backup are removed and the live path stays as it is.
async fn verify_backup(record: &RecordPaths, file: &Path, expected: &[u8]) -> Result<()> {
    if util::hash_file(&record.backup).await? == util::hash_bytes(expected) {
        return Ok(());
    }
    tracing::warn!(name = %record.name, "live file changed during apply, discarding result");
    discard_apply_artifacts(record).await;
    Err(PatchError::Changed {
        path: file.to_path_buf(),
    })
}

async fn discard_apply_artifacts(record: &RecordPaths) {
    util::remove_best_effort(&record.patched).await;
    util::remove_best_effort(&record.backup).await;
}

/// Put the pre-apply bytes back at the live path.
///
/// A live path that is not a symlink means nothing is applied and the call is
/// a no-op. Removal of the backup and patched result afterwards is best-effort.
pub async fn revert_patch(config: &Config, file: &Path) -> Result<RevertOutcome> {
    let store = PatchStore::new(&config.store_root);
    let record = store.record_for(file)?;

    if !util::is_symlink(file, "live file").await? {
        tracing::info!(name = %record.name, "not applied, nothing to revert");
        return Ok(RevertOutcome::NotApplied);
    }
    if !util::exists(&record.backup).await {
        return Err(PatchError::missing("backup", &record.backup));
    }

    let temp = util::sibling_temp(file, "restore");
    let bytes = match util::copy_durable(&record.backup, &temp).await {
        Ok(bytes) => bytes,
        Err(e) => {
            util::remove_best_effort(&temp).await;
            return Err(e);
        }
    };
    util::replace_with(&temp, file).await?;
    tracing::debug!(name = %record.name, bytes, "live file restored");

    discard_apply_artifacts(&record).await;

    tracing::info!(name = %record.name, "reverted");
    Ok(RevertOutcome::Restored {
        name: record.name,
        bytes,
    })
}
