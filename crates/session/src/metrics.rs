//! Write-path metrics
//!
//! Atomic counters for the serializer and broadcaster. All operations use
//! relaxed ordering; values are eventually consistent, not real-time.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for the shared write serializer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Frames written to a socket
    sent: AtomicU64,

    /// Frames accepted onto a session queue
    queued: AtomicU64,

    /// Frames dropped (queue full, inactive session, discarded on close)
    dropped: AtomicU64,

    /// Socket write errors
    errors: AtomicU64,

    /// Drain tasks currently writing (gauge)
    active_writers: AtomicU64,
}

impl WriterMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            sent: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            active_writers: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn writer_started(&self) {
        self.active_writers.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn writer_finished(&self) {
        self.active_writers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> WriterMetricsSnapshot {
        WriterMetricsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            active_writers: self.active_writers.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`WriterMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriterMetricsSnapshot {
    pub sent: u64,
    pub queued: u64,
    pub dropped: u64,
    pub errors: u64,
    #[serde(rename = "activeWriters")]
    pub active_writers: u64,
}

/// Counters for room fan-out
#[derive(Debug, Default)]
pub struct BroadcastMetrics {
    /// Frames accepted onto a recipient's queue
    success: AtomicU64,

    /// Recipients that could not be reached (queue full, dead session)
    failures: AtomicU64,
}

impl BroadcastMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            success: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> BroadcastMetricsSnapshot {
        BroadcastMetricsSnapshot {
            success: self.success.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`BroadcastMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastMetricsSnapshot {
    pub success: u64,
    pub failures: u64,
}
