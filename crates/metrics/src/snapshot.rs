//! Combined fabric snapshot
//!
//! One document gathering every component's counters, served read-only by
//! the metrics endpoint and logged by the reporter.

use std::sync::Arc;

use serde::Serialize;

use roomcast_persist::{
    BatchWriterHandle, BatchWriterMetricsSnapshot, DeadLetterSink, DlqMetricsSnapshot,
};
use roomcast_pipeline::{
    BatchProducerMetricsSnapshot, BatchPublisher, ConsumerPool, QueueProducer,
};
use roomcast_session::{Broadcaster, RoomRegistry, WriteSerializer, WriterMetricsSnapshot};

use crate::IngressMetrics;

/// Live handles to every component with counters.
pub struct SnapshotSources {
    pub ingress: Arc<IngressMetrics>,
    pub registry: Arc<RoomRegistry>,
    pub serializer: Arc<WriteSerializer>,
    pub broadcaster: Arc<Broadcaster>,
    pub producer: Arc<QueueProducer>,
    pub batch_publisher: Option<Arc<BatchPublisher>>,
    pub consumer: Arc<ConsumerPool>,
    pub batch_writer: BatchWriterHandle,
    pub dlq: Arc<DeadLetterSink>,
}

impl SnapshotSources {
    /// Gather a point-in-time snapshot of the whole fabric.
    pub fn collect(&self) -> FabricSnapshot {
        let ingress = self.ingress.snapshot();
        let consumer = self.consumer.metrics_snapshot();
        let broadcast = self.broadcaster.metrics().snapshot();

        FabricSnapshot {
            messages_received: ingress.messages_received,
            messages_published: ingress.messages_published,
            messages_failed: ingress.messages_failed,
            acks_sent: ingress.acks_sent,
            acks_failed: ingress.acks_failed,
            connections_active: ingress.connections_active,
            connections_total: ingress.connections_total,
            queue_messages_sent: self.producer.metrics_snapshot().messages_sent,
            consumer_processed: consumer.processed,
            consumer_failed: consumer.failed,
            broadcast_success: broadcast.success,
            broadcast_failures: broadcast.failures,
            active_rooms: self.registry.active_rooms() as u64,
            total_sessions: self.registry.total_sessions() as u64,
            write_serializer: self.serializer.metrics().snapshot(),
            batch_writer: self.batch_writer.metrics_snapshot(),
            dlq: self.dlq.metrics_snapshot(),
            producer_batch: self
                .batch_publisher
                .as_ref()
                .map(|publisher| publisher.metrics_snapshot()),
        }
    }
}

/// The read-only counter suite exposed by the metrics surface.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FabricSnapshot {
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
    #[serde(rename = "queueMessagesSent")]
    pub queue_messages_sent: u64,
    #[serde(rename = "consumerProcessed")]
    pub consumer_processed: u64,
    #[serde(rename = "consumerFailed")]
    pub consumer_failed: u64,
    #[serde(rename = "broadcastSuccess")]
    pub broadcast_success: u64,
    #[serde(rename = "broadcastFailures")]
    pub broadcast_failures: u64,
    #[serde(rename = "activeRooms")]
    pub active_rooms: u64,
    #[serde(rename = "totalSessions")]
    pub total_sessions: u64,
    #[serde(rename = "writeSerializer")]
    pub write_serializer: WriterMetricsSnapshot,
    #[serde(rename = "batchWriter")]
    pub batch_writer: BatchWriterMetricsSnapshot,
    pub dlq: DlqMetricsSnapshot,
    #[serde(rename = "producerBatch", skip_serializing_if = "Option::is_none")]
    pub producer_batch: Option<BatchProducerMetricsSnapshot>,
}
