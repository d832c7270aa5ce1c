//! Queue consumer configuration

use std::time::Duration;

use serde::Deserialize;

/// Consumer pool behavior
///
/// The effective worker count is `min(threads, assigned_rooms)`; extra
/// configured threads are never spawned.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Whether this node consumes its assigned room queues
    /// Default: true
    pub enabled: bool,

    /// Maximum consumer workers
    /// Default: 40
    pub threads: usize,

    /// Messages per receive call (external queue caps this at 10)
    /// Default: 10
    pub max_messages: u32,

    /// Long-poll wait per receive (seconds)
    /// Default: 20
    pub wait_time_secs: u64,

    /// Visibility timeout for received messages (seconds)
    /// Default: 30
    pub visibility_timeout_secs: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threads: 40,
            max_messages: 10,
            wait_time_secs: 20,
            visibility_timeout_secs: 30,
        }
    }
}

impl ConsumerConfig {
    /// Long-poll wait as a duration
    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs)
    }

    /// Visibility timeout as a duration
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }
}
