//! Roomcast configuration
//!
//! TOML-based configuration loading with sensible defaults. A minimal
//! config should just work - only specify what you need to change.
//!
//! # Example Minimal Config
//!
//! ```toml
//! [node]
//! node_id = "node-a"
//!
//! [server]
//! port = 8080
//! ```
//!
//! # Example Fleet Config
//!
//! ```toml
//! [node]
//! node_id = "node-b"
//! node_list = ["node-a", "node-b", "node-c", "node-d"]
//!
//! [database]
//! url = "postgres://roomcast@localhost/roomcast"
//! ```

mod consumer;
mod database;
mod error;
mod logging;
mod metrics;
mod node;
mod producer;
mod queue;
mod server;
mod session;
mod validation;
mod writer;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use consumer::ConsumerConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, Result};
pub use logging::LogConfig;
pub use metrics::MetricsConfig;
pub use node::NodeConfig;
pub use producer::{ProducerBatchConfig, ProducerConfig};
pub use queue::{DlqConfig, QueueConfig, QueueMode};
pub use server::ServerConfig;
pub use session::{BroadcastConfig, SessionConfig, WriteSerializerConfig};
pub use writer::BatchWriterConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node identity and fleet membership
    pub node: NodeConfig,

    /// HTTP/WebSocket listener
    pub server: ServerConfig,

    /// External queue naming and URL discovery
    pub queue: QueueConfig,

    /// Dead-letter queue for failed database batches
    pub dlq: DlqConfig,

    /// Queue consumer behavior
    pub consumer: ConsumerConfig,

    /// Queue producer behavior (single-send or micro-batch)
    pub producer: ProducerConfig,

    /// Database batch writer
    pub batch_writer: BatchWriterConfig,

    /// Shared socket write pool
    pub write_serializer: WriteSerializerConfig,

    /// Per-session limits
    pub session: SessionConfig,

    /// Broadcast fan-out options
    pub broadcast: BroadcastConfig,

    /// Relational store (optional; persistence disabled when absent)
    pub database: DatabaseConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// violates a startup invariant.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        // Sort on load so every node computes the same partition assignment.
        config.node.node_list.sort();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Invariant violations here are startup-fatal; nothing later in the
    /// pipeline re-checks them.
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
