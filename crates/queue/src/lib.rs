//! Roomcast queue client
//!
//! The fabric hands every accepted message to an external partitioned FIFO
//! queue and consumes it back on the room's owning node. The queue service
//! itself is an external collaborator; this crate defines the consumed
//! interface ([`QueueClient`]) and ships an in-process implementation
//! ([`InMemoryQueue`]) for single-node deployments and tests.
//!
//! # Delivery model
//!
//! At-least-once: a received message stays invisible for the visibility
//! timeout and becomes receivable again unless deleted. Per-queue FIFO
//! order is preserved, including for redeliveries.

mod client;
mod error;
mod memory;

pub use client::{
    BatchEntry, BatchSendOutcome, QueueAttributes, QueueClient, ReceivedMessage,
};
pub use error::QueueError;
pub use memory::InMemoryQueue;
