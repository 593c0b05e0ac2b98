use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::store::{PatchStore, RecordPaths};
use crate::util;

/// Lifecycle position of a record, derived from what is on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    Untracked,
    Tracked,
    Committed,
    Applied,
    /// An interrupted apply/revert or manual tampering left fields that do not
    /// belong to any single state. Needs manual repair.
    Torn,
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordState::Untracked => "untracked",
            RecordState::Tracked => "tracked",
            RecordState::Committed => "committed",
            RecordState::Applied => "applied",
            RecordState::Torn => "torn",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordStatus {
    pub name: String,
    pub state: RecordState,
    pub live_path: PathBuf,
    /// `None` when the live path does not exist.
    pub live_path_is_symlink: Option<bool>,
    pub has_snapshot: bool,
    pub has_patch: bool,
    pub has_patched: bool,
    pub has_backup: bool,
}

fn classify(status: &RecordStatus, has_dir: bool) -> RecordState {
    if !has_dir {
        return RecordState::Untracked;
    }
    match status.live_path_is_symlink {
        None => RecordState::Torn,
        Some(true) if status.has_backup && status.has_patched => RecordState::Applied,
        Some(true) => RecordState::Torn,
        Some(false) if status.has_backup => RecordState::Torn,
        Some(false) if status.has_patch => RecordState::Committed,
        Some(false) if status.has_snapshot => RecordState::Tracked,
        Some(false) => RecordState::Torn,
    }
}

async fn inspect(record: &RecordPaths, live_path: &Path) -> RecordStatus {
    let live_path_is_symlink = tokio::fs::symlink_metadata(live_path)
        .await
        .ok()
        .map(|m| m.file_type().is_symlink());
    let mut status = RecordStatus {
        name: record.name.clone(),
        state: RecordState::Untracked,
        live_path: live_path.to_path_buf(),
        live_path_is_symlink,
        has_snapshot: util::exists(&record.snapshot).await,
        has_patch: util::exists(&record.patch).await,
        has_patched: util::exists(&record.patched).await,
        has_backup: util::exists(&record.backup).await,
    };
    status.state = classify(&status, util::exists(&record.dir).await);
    status
}

/// Report the state of the record belonging to `file`.
pub async fn record_status(config: &Config, file: &Path) -> Result<RecordStatus> {
    let store = PatchStore::new(&config.store_root);
    let record = store.record_for(file)?;
    Ok(inspect(&record, file).await)
}

/// Report every record under the store, locating live files through the
/// stored original path.
pub async fn all_statuses(config: &Config) -> Result<Vec<RecordStatus>> {
    let store = PatchStore::new(&config.store_root);
    let mut statuses = Vec::new();
    for name in store.record_names().await? {
        let record = store.record_named(&name);
        let live_path = match record.read_original_path().await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "record has no original path");
                PathBuf::from(&name)
            }
        };
        statuses.push(inspect(&record, &live_path).await);
    }
    Ok(statuses)
}
