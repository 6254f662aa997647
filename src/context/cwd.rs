//! Working directory the command will run in.

use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentDir {
    pub path: String,
}

impl CurrentDir {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().into_owned(),
        }
    }

    /// The process working directory, or `.` when it cannot be read (for
    /// example after the directory was deleted).
    pub fn capture_or_dot() -> Self {
        match std::env::current_dir() {
            Ok(dir) => Self::new(dir),
            Err(e) => {
                tracing::warn!("Cannot read current directory: {}", e);
                Self::new(PathBuf::from("."))
            }
        }
    }
}
