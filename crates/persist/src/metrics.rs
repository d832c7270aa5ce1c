//! Persistence metrics

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for the batch writer
#[derive(Debug, Default)]
pub struct BatchWriterMetrics {
    /// Messages accepted into the buffer
    enqueued: AtomicU64,

    /// Messages written to the store
    written: AtomicU64,

    /// Batch flushes performed
    batches: AtomicU64,

    /// Messages rejected because the buffer was full
    dropped: AtomicU64,

    /// Failed batch flushes
    write_errors: AtomicU64,

    /// Messages currently buffered (gauge)
    buffer_size: AtomicU64,
}

impl BatchWriterMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            written: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            buffer_size: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.buffer_size.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dequeued(&self) {
        self.buffer_size.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_flush(&self, written: u64) {
        self.written.fetch_add(written, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> BatchWriterMetricsSnapshot {
        BatchWriterMetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            buffer_size: self.buffer_size.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`BatchWriterMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchWriterMetricsSnapshot {
    pub enqueued: u64,
    pub written: u64,
    pub batches: u64,
    pub dropped: u64,
    #[serde(rename = "writeErrors")]
    pub write_errors: u64,
    #[serde(rename = "bufferSize")]
    pub buffer_size: u64,
}

/// Counters for the dead-letter sink
#[derive(Debug, Default)]
pub struct DlqMetrics {
    /// Messages shipped to the DLQ
    sent: AtomicU64,

    /// Messages that could not be shipped (truly lost)
    lost: AtomicU64,
}

impl DlqMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            sent: AtomicU64::new(0),
            lost: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_lost(&self) {
        self.lost.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> DlqMetricsSnapshot {
        DlqMetricsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            lost: self.lost.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`DlqMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DlqMetricsSnapshot {
    pub sent: u64,
    pub lost: u64,
}
