//! Metadata store error types.

use thiserror::Error;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors that can occur during metadata operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("Video already exists: {0}")]
    AlreadyExists(String),

    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),
}

impl MetadataError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound(id.to_string())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
