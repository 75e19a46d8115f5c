//! Error types for valentine-core

use thiserror::Error;

/// Result type alias using valentine-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by local collaborators (config, token files, progress copy)
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local secret/token storage error
    #[error("Storage error: {0}")]
    Storage(String),
}
