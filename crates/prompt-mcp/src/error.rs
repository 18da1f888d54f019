//! Error types for the MCP server

use thiserror::Error;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during MCP server operations
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the core engine
    #[error(transparent)]
    Core(#[from] prompt_core::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reading or writing the protocol stream
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid tool arguments
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// inspect / switch targeting a missing id
    #[error("not found: {id}")]
    NotFound { id: String },

    /// Resource URI does not exist
    #[error("resource not found: {uri}")]
    ResourceNotFound { uri: String },
}

impl Error {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }
}
