//! Session and write-path configuration

use serde::Deserialize;

/// Shared socket write pool
///
/// One pool drains every session's write queue; sessions never own a
/// dedicated writer thread.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriteSerializerConfig {
    /// Worker tasks in the shared pool
    /// Default: 50
    pub worker_threads: usize,
}

impl Default for WriteSerializerConfig {
    fn default() -> Self {
        Self { worker_threads: 50 }
    }
}

/// Per-session limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Outbound frame queue capacity per session; a full queue drops the
    /// frame (the client is slower than the broadcast rate)
    /// Default: 1000
    pub write_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_queue_capacity: 1000,
        }
    }
}

/// Broadcast fan-out options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Skip sessions whose user id equals the sender's; the reference
    /// deployment does not exclude because the ack is separate from the
    /// broadcast payload
    /// Default: false
    pub exclude_sender: bool,
}
