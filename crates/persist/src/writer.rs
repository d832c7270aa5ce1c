//! Batch writer
//!
//! The buffer between the queue consumers and the database: `enqueue` is a
//! non-blocking offer into a bounded channel, and a single flusher turns
//! the stream into size-or-time triggered batch writes. Consumers must not
//! ack the external queue when `enqueue` returns false - the queue's
//! redelivery is the retry path, not this buffer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use roomcast_config::BatchWriterConfig;
use roomcast_protocol::QueueMessage;

use crate::store::derive_activity_rows;
use crate::{BatchWriterMetrics, BatchWriterMetricsSnapshot, DeadLetterSink, MessageStore};

/// How long the flusher waits for one message before re-checking the
/// time-based flush condition.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cheap cloneable producer side of the writer buffer.
#[derive(Clone)]
pub struct BatchWriterHandle {
    tx: mpsc::Sender<QueueMessage>,
    metrics: Arc<BatchWriterMetrics>,
}

impl BatchWriterHandle {
    /// Offer a message to the buffer.
    ///
    /// Returns `false` when the buffer is full (or the writer has shut
    /// down); the caller must leave the queue message unacked so it is
    /// redelivered.
    pub fn enqueue(&self, message: QueueMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => {
                self.metrics.record_enqueued();
                true
            }
            Err(mpsc::error::TrySendError::Full(message)) => {
                self.metrics.record_dropped();
                tracing::warn!(
                    message_id = %message.message_id,
                    "writer buffer full, leaving message for redelivery"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.record_dropped();
                false
            }
        }
    }

    /// Writer metrics snapshot.
    pub fn metrics_snapshot(&self) -> BatchWriterMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Single-flusher batch writer.
pub struct BatchWriter {
    rx: mpsc::Receiver<QueueMessage>,
    store: Arc<dyn MessageStore>,
    dlq: Arc<DeadLetterSink>,
    config: BatchWriterConfig,
    metrics: Arc<BatchWriterMetrics>,
}

impl BatchWriter {
    /// Create the writer and its enqueue handle.
    ///
    /// Panics when `size > buffer_capacity`; config validation rejects
    /// that combination before anything is constructed.
    pub fn new(
        config: BatchWriterConfig,
        store: Arc<dyn MessageStore>,
        dlq: Arc<DeadLetterSink>,
    ) -> (Self, BatchWriterHandle) {
        assert!(
            config.size <= config.buffer_capacity,
            "batch_writer.size ({}) cannot exceed buffer_capacity ({})",
            config.size,
            config.buffer_capacity
        );

        let (tx, rx) = mpsc::channel(config.buffer_capacity);
        let metrics = Arc::new(BatchWriterMetrics::new());

        let handle = BatchWriterHandle {
            tx,
            metrics: Arc::clone(&metrics),
        };

        (
            Self {
                rx,
                store,
                dlq,
                config,
                metrics,
            },
            handle,
        )
    }

    /// Run the flusher until cancelled, then drain and flush what remains.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            batch_size = self.config.size,
            flush_ms = self.config.flush_ms,
            buffer_capacity = self.config.buffer_capacity,
            "batch writer started"
        );

        let flush_interval = Duration::from_millis(self.config.flush_ms);
        let mut batch: Vec<QueueMessage> = Vec::with_capacity(self.config.size);
        let mut last_flush = Instant::now();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                polled = tokio::time::timeout(POLL_INTERVAL, self.rx.recv()) => {
                    match polled {
                        Ok(Some(message)) => {
                            self.metrics.record_dequeued();
                            batch.push(message);
                        }
                        // All handles dropped; nothing more will arrive.
                        Ok(None) => break,
                        // Poll timeout; fall through to the flush check.
                        Err(_) => {}
                    }
                }
            }

            let should_flush = batch.len() >= self.config.size
                || (!batch.is_empty() && last_flush.elapsed() >= flush_interval);
            if should_flush {
                self.flush(&mut batch).await;
                last_flush = Instant::now();
            }
        }

        // Drain whatever the consumers managed to hand over, then flush the
        // final partial batch.
        while let Ok(message) = self.rx.try_recv() {
            self.metrics.record_dequeued();
            batch.push(message);
            if batch.len() >= self.config.size {
                self.flush(&mut batch).await;
            }
        }
        if !batch.is_empty() {
            tracing::info!(count = batch.len(), "flushing final batch on shutdown");
            self.flush(&mut batch).await;
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            enqueued = snapshot.enqueued,
            written = snapshot.written,
            batches = snapshot.batches,
            dropped = snapshot.dropped,
            write_errors = snapshot.write_errors,
            "batch writer stopped"
        );
    }

    /// Write one batch: message insert, then the activity rollup derived
    /// from the rows the insert actually created. Any failure diverts the
    /// whole batch to the dead-letter sink.
    async fn flush(&self, batch: &mut Vec<QueueMessage>) {
        if batch.is_empty() {
            return;
        }

        let started = Instant::now();
        let result = self.write_batch(batch).await;

        match result {
            Ok(inserted) => {
                self.metrics.record_flush(inserted);
                tracing::debug!(
                    batch = batch.len(),
                    inserted,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "batch flushed"
                );
            }
            Err(reason) => {
                self.metrics.record_write_error();
                tracing::error!(batch = batch.len(), error = %reason, "batch flush failed");
                self.dlq.ship(batch, &reason).await;
            }
        }

        batch.clear();
    }

    async fn write_batch(&self, batch: &[QueueMessage]) -> Result<u64, String> {
        let inserted_ids: std::collections::HashSet<String> = self
            .store
            .batch_insert_messages(batch)
            .await
            .map_err(|e| format!("message insert failed: {e}"))?
            .into_iter()
            .collect();

        // Rollups count each message exactly once: only rows the insert
        // created (duplicates from redelivery are skipped) contribute.
        let inserted: Vec<QueueMessage> = batch
            .iter()
            .filter(|m| inserted_ids.contains(&m.message_id))
            .cloned()
            .collect();
        let activity = derive_activity_rows(&inserted);
        self.store
            .batch_upsert_user_activity(&activity)
            .await
            .map_err(|e| format!("user activity upsert failed: {e}"))?;

        Ok(inserted_ids.len() as u64)
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
