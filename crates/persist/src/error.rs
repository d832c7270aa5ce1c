//! Persistence error types

use thiserror::Error;

/// Errors surfaced by the message store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database-level failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store rejected the batch for a non-database reason
    #[error("write failed: {0}")]
    Write(String),
}

impl StoreError {
    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }
}
