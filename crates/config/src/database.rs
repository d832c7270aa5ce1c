//! Relational store configuration

use serde::Deserialize;

/// Database connection
///
/// Persistence is optional: with no `url`, the batch writer runs against a
/// no-op store and messages are broadcast but not persisted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection URL
    pub url: Option<String>,

    /// Connection pool size
    /// Default: 8
    pub max_connections: Option<u32>,
}

impl DatabaseConfig {
    /// Effective pool size
    pub fn effective_max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(8)
    }
}
