//! Write serializer
//!
//! Serializes all outbound socket writes through per-session FIFO queues
//! drained by a fixed shared worker pool, so ten thousand connections never
//! cost ten thousand writer threads.
//!
//! # Drain protocol
//!
//! Each session carries a work-in-progress counter `wip`. `send` enqueues
//! the frame and fetch-and-increments `wip`; when the previous value was
//! zero it hands the session to the pool. The drain task empties the queue,
//! then consumes the work it observed:
//!
//! ```text
//! missed = 1
//! loop:
//!   while let Some(frame) = queue.poll(): write frame
//!   missed = wip.sub(missed)        // consume the work we just did
//!   if missed == 0: return
//! ```
//!
//! The counter guarantees at most one drain task per session at any time,
//! while frames submitted mid-drain are picked up by the same task instead
//! of scheduling a second one.
//!
//! Sessions are sharded across workers by id, so a session's drain requests
//! always land on the same worker queue.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{RoomRegistry, Session, WriterMetrics};

/// Shared-pool socket write serializer.
pub struct WriteSerializer {
    shards: Vec<mpsc::UnboundedSender<Arc<Session>>>,
    registry: Arc<RoomRegistry>,
    metrics: Arc<WriterMetrics>,
}

impl WriteSerializer {
    /// Start the serializer with `worker_threads` drain workers.
    ///
    /// Returns the serializer handle and the worker join handles; workers
    /// exit on cancellation, dropping any still-queued frames (counted).
    pub fn start(
        registry: Arc<RoomRegistry>,
        worker_threads: usize,
        cancel: CancellationToken,
    ) -> (Arc<Self>, Vec<JoinHandle<()>>) {
        let worker_threads = worker_threads.max(1);
        let metrics = Arc::new(WriterMetrics::new());

        let mut shards = Vec::with_capacity(worker_threads);
        let mut handles = Vec::with_capacity(worker_threads);

        for worker_id in 0..worker_threads {
            let (tx, rx) = mpsc::unbounded_channel();
            shards.push(tx);
            handles.push(tokio::spawn(drain_worker(
                worker_id,
                rx,
                Arc::clone(&registry),
                Arc::clone(&metrics),
                cancel.clone(),
            )));
        }

        tracing::info!(worker_threads, "write serializer started");

        (
            Arc::new(Self {
                shards,
                registry,
                metrics,
            }),
            handles,
        )
    }

    /// Queue a frame for a session.
    ///
    /// Non-blocking. Returns `false` when the frame was dropped: the
    /// session is inactive or its write queue is full. A full queue means
    /// the client is slower than the broadcast rate; bounded loss is the
    /// defined behavior and the session stays open.
    pub fn send(&self, session: &Arc<Session>, frame: String) -> bool {
        if !session.is_open() {
            self.metrics.record_dropped(1);
            return false;
        }

        if !session.offer(frame) {
            self.metrics.record_dropped(1);
            tracing::warn!(
                session_id = session.id(),
                room_id = session.room_id(),
                "session queue full, dropping frame"
            );
            return false;
        }
        self.metrics.record_queued();

        if session.wip.fetch_add(1, Ordering::AcqRel) == 0 {
            let shard = &self.shards[session.id() as usize % self.shards.len()];
            if shard.send(Arc::clone(session)).is_err() {
                // Pool already shut down; revert so the counter stays
                // consistent with scheduled work.
                session.wip.fetch_sub(1, Ordering::AcqRel);
            }
        }

        true
    }

    /// Serializer metrics.
    pub fn metrics(&self) -> &Arc<WriterMetrics> {
        &self.metrics
    }
}

/// Pool worker: drains sessions handed to this shard, one at a time.
async fn drain_worker(
    worker_id: usize,
    mut rx: mpsc::UnboundedReceiver<Arc<Session>>,
    registry: Arc<RoomRegistry>,
    metrics: Arc<WriterMetrics>,
    cancel: CancellationToken,
) {
    tracing::debug!(worker_id, "write worker starting");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(session) => drain_session(session, &registry, &metrics).await,
                None => break,
            },
        }
    }

    tracing::debug!(worker_id, "write worker stopping");
}

/// Drain one session's queue; serialized per session by the wip counter.
async fn drain_session(
    session: Arc<Session>,
    registry: &Arc<RoomRegistry>,
    metrics: &Arc<WriterMetrics>,
) {
    metrics.writer_started();

    let mut missed: usize = 1;
    loop {
        while let Some(frame) = session.poll() {
            if !session.is_open() {
                discard_session(&session, registry, metrics);
                metrics.writer_finished();
                return;
            }

            if let Err(e) = session.transport.send_text(&frame).await {
                tracing::warn!(
                    session_id = session.id(),
                    room_id = session.room_id(),
                    error = %e,
                    "socket write failed, closing session"
                );
                metrics.record_error();
                discard_session(&session, registry, metrics);
                metrics.writer_finished();
                return;
            }
            metrics.record_sent();
        }

        // Consume the work observed so far; a non-zero remainder means more
        // frames arrived while we were writing.
        let remaining = session.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
        if remaining == 0 {
            break;
        }
        missed = remaining;
    }

    metrics.writer_finished();
}

/// Close a dead session, dropping whatever was still queued.
fn discard_session(
    session: &Arc<Session>,
    registry: &Arc<RoomRegistry>,
    metrics: &Arc<WriterMetrics>,
) {
    let dropped = session.close();
    if dropped > 0 {
        metrics.record_dropped(dropped as u64);
    }
    registry.remove(session);
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
