//! Ingress metrics
//!
//! Counters for the WebSocket frame path, shared between the socket
//! handlers and the metrics surface.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for the WebSocket ingress
#[derive(Debug, Default)]
pub struct IngressMetrics {
    /// Frames received on any socket
    messages_received: AtomicU64,

    /// Frames accepted and handed to the producer
    messages_published: AtomicU64,

    /// Frames rejected (parse, validation, or producer failure)
    messages_failed: AtomicU64,

    /// Acks enqueued to the sender
    acks_sent: AtomicU64,

    /// Acks that could not be enqueued
    acks_failed: AtomicU64,

    /// Currently open connections
    connections_active: AtomicU64,

    /// Connections accepted since start
    connections_total: AtomicU64,
}

impl IngressMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            acks_sent: AtomicU64::new(0),
            acks_failed: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_published(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed(&self) {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_ack_sent(&self) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_ack_failed(&self) {
        self.acks_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> IngressMetricsSnapshot {
        IngressMetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            acks_failed: self.acks_failed.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`IngressMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngressMetricsSnapshot {
    #[serde(rename = "messagesReceived")]
    pub messages_received: u64,
    #[serde(rename = "messagesPublished")]
    pub messages_published: u64,
    #[serde(rename = "messagesFailed")]
    pub messages_failed: u64,
    #[serde(rename = "acksSent")]
    pub acks_sent: u64,
    #[serde(rename = "acksFailed")]
    pub acks_failed: u64,
    #[serde(rename = "connectionsActive")]
    pub connections_active: u64,
    #[serde(rename = "connectionsTotal")]
    pub connections_total: u64,
}
