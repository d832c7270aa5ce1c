//! Queue client interface
//!
//! The operations the fabric requires from the external queue service.
//! Implementations must preserve FIFO order per queue and honor
//! at-least-once semantics: a received message is invisible for the
//! visibility timeout and reappears unless deleted.

use std::time::Duration;

use async_trait::async_trait;

use crate::QueueError;

/// A message handed back by `receive`
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Wire body as submitted by the producer
    pub body: String,

    /// Opaque handle used to delete this delivery
    pub receipt_handle: String,
}

/// One entry of a batch send
#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// Caller-chosen id echoed back in the outcome
    pub id: String,

    /// Wire body
    pub body: String,

    /// FIFO partition key
    pub group_id: String,

    /// Deduplication id
    pub dedup_id: String,
}

/// Result of a batch send; the queue may accept a subset
#[derive(Debug, Clone, Default)]
pub struct BatchSendOutcome {
    /// Entry ids the queue accepted
    pub successful: Vec<String>,

    /// Entry ids the queue rejected, with reasons
    pub failed: Vec<(String, String)>,
}

/// Approximate queue depth counters
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueAttributes {
    /// Messages currently receivable
    pub approx_messages: u64,

    /// Messages received but not yet deleted (in flight)
    pub approx_not_visible: u64,

    /// Messages delayed before first visibility
    pub approx_delayed: u64,
}

/// Client for the external partitioned queue service
///
/// URLs are opaque strings resolved from queue names; callers cache them
/// (the producer and consumer both keep lazy caches with retry stamps).
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Resolve a queue name to its URL
    ///
    /// Fails when the queue does not exist; queues are provisioned by the
    /// operator, never auto-created by the fabric.
    async fn get_queue_url(&self, name: &str) -> Result<String, QueueError>;

    /// Send a single message
    async fn send(
        &self,
        url: &str,
        body: String,
        group_id: &str,
        dedup_id: &str,
    ) -> Result<(), QueueError>;

    /// Send up to 10 messages in one call
    async fn send_batch(
        &self,
        url: &str,
        entries: Vec<BatchEntry>,
    ) -> Result<BatchSendOutcome, QueueError>;

    /// Long-poll receive
    ///
    /// Waits up to `wait_time` for messages, returning at most
    /// `max_messages`. Returned messages are invisible to other receivers
    /// for `visibility_timeout`.
    async fn receive(
        &self,
        url: &str,
        max_messages: u32,
        wait_time: Duration,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Delete a delivered message by its receipt handle
    async fn delete(&self, url: &str, receipt_handle: &str) -> Result<(), QueueError>;

    /// Approximate depth counters for monitoring
    async fn attributes(&self, url: &str) -> Result<QueueAttributes, QueueError>;
}
