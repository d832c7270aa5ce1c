//! Queue producer configuration

use serde::Deserialize;

/// Producer behavior
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Micro-batching; off by default (synchronous single sends)
    pub batch: ProducerBatchConfig,
}

/// Micro-batch producer
///
/// When enabled, the ack to the sender is optimistic: success is reported
/// when the message is accepted into the room's batch, before the network
/// send. Operators requiring strict delivery semantics must leave this
/// disabled.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerBatchConfig {
    /// Default: false
    pub enabled: bool,

    /// Messages per batch send; the external queue caps a batch call at 10
    /// Default: 10
    pub max_size: usize,

    /// Background flush interval (milliseconds)
    /// Default: 100
    pub flush_ms: u64,

    /// Per-room in-memory batch capacity
    /// Default: 100
    pub room_capacity: usize,
}

impl Default for ProducerBatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_size: 10,
            flush_ms: 100,
            room_capacity: 100,
        }
    }
}
