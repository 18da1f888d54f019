//! Error types for prompt-git

use std::path::PathBuf;

/// Result type for prompt-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git synchronisation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying git operation failed
    #[error(transparent)]
    Git(#[from] git2::Error),

    /// Filesystem failure while preparing the target directory
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sync gave up after exhausting its retries; carries the last error
    #[error("sync of '{url}' failed after {attempts} attempt(s): {source}")]
    SyncFailed {
        url: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The target directory is not a git repository
    #[error("not a git repository: {path}")]
    NotARepository { path: PathBuf },
}

impl Error {
    pub fn sync_failed(url: impl Into<String>, attempts: u32, source: Error) -> Self {
        Self::SyncFailed {
            url: url.into(),
            attempts,
            source: Box::new(source),
        }
    }
}
