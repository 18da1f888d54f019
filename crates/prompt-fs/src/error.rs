//! Error types for prompt-fs

use std::path::{Path, PathBuf};

/// Result type for prompt-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in filesystem operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic filesystem failure during scan/read/copy
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path expected to be a readable directory is not one
    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A configured source location failed validation
    #[error("invalid source '{value}': {reason}")]
    InvalidSource { value: String, reason: String },
}

impl Error {
    /// Wrap an `std::io::Error` with the path it occurred at.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid_source(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
