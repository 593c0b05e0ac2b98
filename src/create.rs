use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{PatchError, Result};
use crate::patch_format::{self, PatchStats};
use crate::store::PatchStore;
use crate::util;

#[derive(Debug)]
pub struct TrackSummary {
    pub name: String,
    /// The editable copy the user is expected to modify.
    pub snapshot: PathBuf,
    pub original_path: PathBuf,
}

#[derive(Debug)]
pub struct CommitSummary {
    pub name: String,
    pub patch: PathBuf,
    pub stats: PatchStats,
}

/// Start tracking `file`: snapshot its content into a fresh (or reset) record.
/// The live file is left untouched.
pub async fn track_file(config: &Config, file: &Path) -> Result<TrackSummary> {
    let store = PatchStore::new(&config.store_root);
    let record = store.record_for(file)?;

    let meta = tokio::fs::metadata(file)
        .await
        .map_err(PatchError::not_found("source file", file))?;
    if !meta.is_file() {
        return Err(PatchError::missing("regular source file", file));
    }
    let absolute = tokio::fs::canonicalize(file)
        .await
        .map_err(PatchError::not_found("source file", file))?;
    let content = tokio::fs::read(&absolute)
        .await
        .map_err(PatchError::not_found("source file", file))?;

    store.ensure_record_dir(&record).await?;
    util::write_durable(&record.snapshot, &content).await?;
    util::write_durable(
        &record.original_path,
        absolute.to_string_lossy().as_bytes(),
    )
    .await?;

    tracing::info!(name = %record.name, snapshot = %record.snapshot.display(), "tracked");
    Ok(TrackSummary {
        name: record.name,
        snapshot: record.snapshot,
        original_path: absolute,
    })
}

/// Diff the live file (original side) against the edited snapshot (modified
/// side) and store the result as the record's patch text.
///
/// Re-running overwrites the patch from whatever snapshot currently exists.
pub async fn commit_patch(config: &Config, file: &Path) -> Result<CommitSummary> {
    let store = PatchStore::new(&config.store_root);
    let record = store.record_for(file)?;

    if !util::exists(&record.dir).await {
        return Err(PatchError::missing("patch record", &record.dir));
    }
    let original = util::read_text(file, "tracked file").await?;
    let modified = util::read_text(&record.snapshot, "snapshot").await?;

    let text = patch_format::render(&record.name, &original, &modified);
    let stats = patch_format::parse(&text).stats();
    util::write_durable(&record.patch, text.as_bytes()).await?;
    tracing::debug!(patch = %record.patch.display(), hunks = stats.hunks, "patch written");

    util::remove_best_effort(&record.snapshot).await;

    tracing::info!(name = %record.name, "committed");
    Ok(CommitSummary {
        name: record.name,
        patch: record.patch,
        stats,
    })
}
