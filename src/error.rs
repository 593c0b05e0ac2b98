use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures surfaced by the patch lifecycle operations.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A required input (source file, snapshot, patch text, backup, record) is
    /// missing or cannot be read.
    #[error("{what} not found or unreadable: {}", path.display())]
    NotFound {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    /// A filesystem mutation failed.
    #[error("failed to {action}: {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The patch does not match the live file, even inside the fuzz window.
    #[error("patch for {name} does not apply: hunk #{hunk} (recorded at line {line}) has no match")]
    ApplyConflict {
        name: String,
        hunk: usize,
        line: usize,
    },

    #[error("path has no usable file name: {}", path.display())]
    InvalidPath { path: PathBuf },

    /// The file name collides with a field file of its own record.
    #[error("cannot track a file named {name}: the name is reserved by the patch record")]
    ReservedName { name: String },

    #[error("{} is already patched; revert it before applying again", path.display())]
    AlreadyApplied { path: PathBuf },

    #[error("{} changed while the patch was being applied", path.display())]
    Changed { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, PatchError>;

impl PatchError {
    pub fn not_found(what: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| PatchError::NotFound {
            what,
            path,
            source: Some(source),
        }
    }

    pub fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| PatchError::Io {
            action,
            path,
            source,
        }
    }

    pub fn missing(what: &'static str, path: &Path) -> Self {
        PatchError::NotFound {
            what,
            path: path.to_path_buf(),
            source: None,
        }
    }
}
