use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{PatchError, Result};

pub const ORIGINAL_PATH_FILE: &str = "original-path.txt";
pub const PATCH_SUFFIX: &str = ".patch";
pub const PATCHED_SUFFIX: &str = ".patched";
pub const BACKUP_SUFFIX: &str = ".original.backup";

/// The storage root holding one record directory per tracked file name.
#[derive(Debug, Clone)]
pub struct PatchStore {
    root: PathBuf,
}

/// Locations of every field of a single patch record.
///
/// Records are keyed by the tracked file's base name only, so two files named
/// alike in different directories share one record. A file named like the
/// original-path field would snapshot over it and is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPaths {
    pub name: String,
    pub dir: PathBuf,
    /// Editable copy made by `create`, removed by `commit`.
    pub snapshot: PathBuf,
    pub original_path: PathBuf,
    pub patch: PathBuf,
    /// Result of applying the patch; the live path links here while applied.
    pub patched: PathBuf,
    pub backup: PathBuf,
}

impl PatchStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the record belonging to `file`.
    pub fn record_for(&self, file: &Path) -> Result<RecordPaths> {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PatchError::InvalidPath {
                path: file.to_path_buf(),
            })?;
        if name == ORIGINAL_PATH_FILE {
            return Err(PatchError::ReservedName {
                name: name.to_string(),
            });
        }
        Ok(self.record_named(name))
    }

    pub fn record_named(&self, name: &str) -> RecordPaths {
        let dir = self.root.join(name);
        RecordPaths {
            name: name.to_string(),
            snapshot: dir.join(name),
            original_path: dir.join(ORIGINAL_PATH_FILE),
            patch: dir.join(format!("{name}{PATCH_SUFFIX}")),
            patched: dir.join(format!("{name}{PATCHED_SUFFIX}")),
            backup: dir.join(format!("{name}{BACKUP_SUFFIX}")),
            dir,
        }
    }

    /// Create the root and the record directory; both may already exist.
    pub async fn ensure_record_dir(&self, record: &RecordPaths) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(PatchError::io("create storage root", &self.root))?;
        tokio::fs::create_dir_all(&record.dir)
            .await
            .map_err(PatchError::io("create record directory", &record.dir))
    }

    /// Names of all record directories, sorted. A missing root yields no records.
    pub async fn record_names(&self) -> Result<Vec<String>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            if !root.is_dir() {
                return Ok(Vec::new());
            }
            let mut names = Vec::new();
            for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
                let entry = entry.map_err(|e| PatchError::Io {
                    action: "scan storage root",
                    path: root.clone(),
                    source: e.into(),
                })?;
                if !entry.file_type().is_dir() {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
            names.sort();
            Ok(names)
        })
        .await
        .map_err(|e| PatchError::Io {
            action: "scan storage root",
            path: self.root.clone(),
            source: std::io::Error::other(e),
        })?
    }
}

impl RecordPaths {
    /// Read back the live file location stored by `create`.
    pub async fn read_original_path(&self) -> Result<PathBuf> {
        let text = crate::util::read_text(&self.original_path, "original path").await?;
        Ok(PathBuf::from(text.trim_end_matches(['\r', '\n'])))
    }
}
