//! Error types for prompt-core

/// Result type for prompt-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed configuration; fatal at startup
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Every configured user source failed to load
    #[error("no prompt source could be loaded: {}", failures.join("; "))]
    Load { failures: Vec<String> },

    /// Filesystem error from prompt-fs
    #[error(transparent)]
    Fs(#[from] prompt_fs::Error),

    /// Git error from prompt-git
    #[error(transparent)]
    Git(#[from] prompt_git::Error),

    /// Filesystem watcher could not be created or attached
    #[error("watch error: {message}")]
    Watch { message: String },

    /// A coalesced reload failed in the call that actually ran it
    #[error("reload failed: {message}")]
    Reload { message: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }
}
