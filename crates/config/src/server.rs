//! HTTP/WebSocket listener configuration

use serde::Deserialize;

/// Listener for the chat socket and the health/metrics surface
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub host: String,

    /// Listen port
    /// Default: 8080
    pub port: u16,

    /// Seconds to wait for components during graceful shutdown
    /// Default: 10
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
