//! External queue naming and discovery

use serde::Deserialize;

/// Which queue transport backs the fabric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// In-process queue; single-node deployments and tests
    Memory,
    /// Externally hosted partitioned queue service
    External,
}

/// Queue naming and URL discovery
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue transport
    /// Default: memory (the hosted service is deployed separately)
    pub mode: QueueMode,

    /// Per-room queue name prefix; the room id is appended
    /// Default: "roomcast-room-"
    pub prefix: String,

    /// Whether queues are FIFO (".fifo" suffix, group + dedup ids)
    /// Default: true
    pub fifo_enabled: bool,

    /// Retry interval for lazy queue-URL discovery (milliseconds)
    /// Default: 60000
    pub url_retry_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: QueueMode::Memory,
            prefix: "roomcast-room-".into(),
            fifo_enabled: true,
            url_retry_ms: 60_000,
        }
    }
}

impl QueueConfig {
    /// Queue name for a room, with the FIFO suffix when enabled
    pub fn queue_name(&self, room_id: u32) -> String {
        if self.fifo_enabled {
            format!("{}{}.fifo", self.prefix, room_id)
        } else {
            format!("{}{}", self.prefix, room_id)
        }
    }
}

/// Dead-letter queue for failed database batches
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DlqConfig {
    /// Whether failed batches are shipped to the DLQ
    /// Default: true (disabling means failed batches are lost)
    pub enabled: bool,

    /// Name of the dead-letter queue
    pub queue_name: String,
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_name: "roomcast-db-dlq".into(),
        }
    }
}
