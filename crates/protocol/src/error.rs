//! Protocol error types

use thiserror::Error;

/// Errors from parsing wire documents.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed JSON or a document that does not match the schema.
    #[error("invalid message format: {0}")]
    Parse(#[from] serde_json::Error),
}
