//! Core error types for `Birdline`.

use thiserror::Error;

/// Core error type for `Birdline` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Credential is missing one of its tokens.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Invalid data from API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A persistence port failed to read or write its record.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
