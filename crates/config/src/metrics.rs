//! Metrics reporting configuration

use std::time::Duration;

use serde::Deserialize;

/// Periodic metrics summary reporting
///
/// The `/metrics` endpoint is always available; this only controls the
/// periodic log line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Default: true
    pub enabled: bool,

    /// Reporting interval in seconds
    /// Default: 30
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

impl MetricsConfig {
    /// Reporting interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
