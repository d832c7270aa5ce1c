//! Configuration validation
//!
//! Startup invariants. A violation here aborts the process before any
//! component is constructed; nothing later re-checks these.

use crate::{Config, ConfigError, Result};

/// Validate a parsed configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.node.node_id.trim().is_empty() {
        return Err(ConfigError::invalid_value(
            "node",
            "node_id",
            "must not be empty",
        ));
    }

    if config.node.rooms == 0 {
        return Err(ConfigError::invalid_value(
            "node",
            "rooms",
            "must be at least 1",
        ));
    }

    // The writer can never stage a batch larger than its buffer.
    if config.batch_writer.size > config.batch_writer.buffer_capacity {
        return Err(ConfigError::invalid_value(
            "batch_writer",
            "size",
            format!(
                "size ({}) cannot exceed buffer_capacity ({})",
                config.batch_writer.size, config.batch_writer.buffer_capacity
            ),
        ));
    }

    if config.batch_writer.size == 0 {
        return Err(ConfigError::invalid_value(
            "batch_writer",
            "size",
            "must be at least 1",
        ));
    }

    if !(1..=10).contains(&config.consumer.max_messages) {
        return Err(ConfigError::invalid_value(
            "consumer",
            "max_messages",
            "must be between 1 and 10",
        ));
    }

    if config.consumer.threads == 0 {
        return Err(ConfigError::invalid_value(
            "consumer",
            "threads",
            "must be at least 1",
        ));
    }

    // The external queue rejects batch sends with more than 10 entries.
    if !(1..=10).contains(&config.producer.batch.max_size) {
        return Err(ConfigError::invalid_value(
            "producer.batch",
            "max_size",
            "must be between 1 and 10",
        ));
    }

    if config.producer.batch.enabled && config.producer.batch.room_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "producer.batch",
            "room_capacity",
            "must be at least 1",
        ));
    }

    if config.write_serializer.worker_threads == 0 {
        return Err(ConfigError::invalid_value(
            "write_serializer",
            "worker_threads",
            "must be at least 1",
        ));
    }

    if config.session.write_queue_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "session",
            "write_queue_capacity",
            "must be at least 1",
        ));
    }

    if config.dlq.enabled && config.dlq.queue_name.trim().is_empty() {
        return Err(ConfigError::invalid_value(
            "dlq",
            "queue_name",
            "must not be empty when the DLQ is enabled",
        ));
    }

    Ok(())
}
