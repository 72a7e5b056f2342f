//! Error types for engine operations.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur inside the embedded engine adapter.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An error reported by tantivy.
    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stored-field payload could not be encoded or decoded.
    #[error("stored field codec error: {0}")]
    Codec(String),

    /// A caller passed an argument the engine cannot honour.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The writer has already been closed.
    #[error("writer is closed")]
    WriterClosed,
}

impl EngineError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<tantivy::directory::error::OpenDirectoryError> for EngineError {
    fn from(err: tantivy::directory::error::OpenDirectoryError) -> Self {
        Self::Tantivy(err.into())
    }
}
