use std::path::PathBuf;

/// Storage root used when none is given, relative to the working directory.
pub const DEFAULT_STORE_ROOT: &str = "patches";

/// How many lines a hunk may drift from its recorded position by default.
pub const DEFAULT_FUZZ: usize = 3;

/// Settings shared by every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding one record directory per tracked file name.
    pub store_root: PathBuf,
    /// Maximum hunk displacement, in lines, tolerated by apply.
    pub fuzz: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from(DEFAULT_STORE_ROOT),
            fuzz: DEFAULT_FUZZ,
        }
    }
}
