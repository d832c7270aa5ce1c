//! Pipeline metrics

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for the single-send producer
#[derive(Debug, Default)]
pub struct ProducerMetrics {
    /// Messages handed to the external queue
    messages_sent: AtomicU64,

    /// Publishes that failed (unreachable queue, unresolved URL)
    publish_failures: AtomicU64,
}

impl ProducerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> ProducerMetricsSnapshot {
        ProducerMetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`ProducerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProducerMetricsSnapshot {
    #[serde(rename = "messagesSent")]
    pub messages_sent: u64,
    #[serde(rename = "publishFailures")]
    pub publish_failures: u64,
}

/// Counters for the micro-batch producer
#[derive(Debug, Default)]
pub struct BatchProducerMetrics {
    /// Messages accepted into a room batch
    queued: AtomicU64,

    /// Batch sends issued
    batches_sent: AtomicU64,

    /// Messages carried by those batches
    messages_in_batches: AtomicU64,

    /// Batch sends with at least one failed entry
    batches_failed: AtomicU64,

    /// Messages dropped (room batch full, unresolved URL, failed entries)
    dropped: AtomicU64,
}

impl BatchProducerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            queued: AtomicU64::new(0),
            batches_sent: AtomicU64::new(0),
            messages_in_batches: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch(&self, messages: u64) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.messages_in_batches.fetch_add(messages, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> BatchProducerMetricsSnapshot {
        BatchProducerMetricsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            messages_in_batches: self.messages_in_batches.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`BatchProducerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchProducerMetricsSnapshot {
    pub queued: u64,
    #[serde(rename = "batchesSent")]
    pub batches_sent: u64,
    #[serde(rename = "messagesInBatches")]
    pub messages_in_batches: u64,
    #[serde(rename = "batchesFailed")]
    pub batches_failed: u64,
    pub dropped: u64,
}

/// Counters for the consumer pool
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    /// Messages processed and acked
    processed: AtomicU64,

    /// Messages that failed processing (parse errors, ack left undone)
    failed: AtomicU64,
}

impl ConsumerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> ConsumerMetricsSnapshot {
        ConsumerMetricsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`ConsumerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerMetricsSnapshot {
    pub processed: u64,
    pub failed: u64,
}
