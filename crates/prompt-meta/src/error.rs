//! Error types for prompt-meta

use std::path::PathBuf;

/// Result type for prompt-meta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading and validating prompt documents
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File could not be read
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML is not well-formed
    #[error("YAML parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Document structure violates the prompt-document schema
    #[error("schema violation in {path}: {fields:?}")]
    Schema {
        path: PathBuf,
        /// Field paths that failed validation
        fields: Vec<String>,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
