//! Database batch writer configuration

use serde::Deserialize;

/// Persistence batching
///
/// `size` must not exceed `buffer_capacity`; the violation is fatal at
/// startup (see crate validation).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchWriterConfig {
    /// Messages per batch insert
    /// Default: 1000
    pub size: usize,

    /// Maximum age of a partial batch before it is flushed (milliseconds)
    /// Default: 1000
    pub flush_ms: u64,

    /// Capacity of the in-memory buffer ahead of the flusher
    /// Default: 10000
    pub buffer_capacity: usize,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            flush_ms: 1000,
            buffer_capacity: 10_000,
        }
    }
}
