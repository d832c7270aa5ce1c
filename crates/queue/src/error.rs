//! Queue client error types

use thiserror::Error;

/// Errors surfaced by queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue name does not resolve to a URL
    #[error("queue '{name}' does not exist")]
    QueueDoesNotExist {
        /// The unresolvable queue name
        name: String,
    },

    /// URL does not refer to a known queue
    #[error("unknown queue url '{url}'")]
    UnknownUrl {
        /// The stale or malformed URL
        url: String,
    },

    /// Receipt handle no longer refers to an in-flight delivery
    #[error("receipt handle is invalid or expired")]
    InvalidReceipt,

    /// Transport-level send failure
    #[error("send failed: {0}")]
    Send(String),

    /// Transport-level receive failure
    #[error("receive failed: {0}")]
    Receive(String),
}
