//! Periodic metrics reporter
//!
//! Logs one structured summary line per interval so operators see
//! throughput and loss without scraping the HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::SnapshotSources;

/// Interval logger over the fabric snapshot.
pub struct Reporter {
    sources: Arc<SnapshotSources>,
    interval: Duration,
}

impl Reporter {
    /// Create a reporter with the given interval.
    pub fn new(sources: Arc<SnapshotSources>, interval: Duration) -> Self {
        Self { sources, interval }
    }

    /// Run until cancelled, logging a final summary on the way out.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "metrics reporter started");
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so the first report
        // covers a full interval.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.report(),
            }
        }

        self.report();
        tracing::info!("metrics reporter stopped");
    }

    fn report(&self) {
        let s = self.sources.collect();
        tracing::info!(
            messages_received = s.messages_received,
            messages_published = s.messages_published,
            messages_failed = s.messages_failed,
            queue_messages_sent = s.queue_messages_sent,
            consumer_processed = s.consumer_processed,
            consumer_failed = s.consumer_failed,
            broadcast_success = s.broadcast_success,
            broadcast_failures = s.broadcast_failures,
            active_rooms = s.active_rooms,
            total_sessions = s.total_sessions,
            writer_sent = s.write_serializer.sent,
            writer_dropped = s.write_serializer.dropped,
            db_written = s.batch_writer.written,
            db_dropped = s.batch_writer.dropped,
            db_buffer = s.batch_writer.buffer_size,
            "fabric metrics"
        );
    }
}
