//! Shared application state
//!
//! Every handler and background task sees the fabric through this handle.
//! Components are constructed once in `serve::build_fabric` and shared by
//! `Arc`; there is no global state.

use std::sync::Arc;

use roomcast_config::Config;
use roomcast_metrics::{IngressMetrics, SnapshotSources};
use roomcast_persist::MessageStore;
use roomcast_pipeline::{BatchPublisher, ConsumerPool, QueueProducer};
use roomcast_protocol::QueueMessage;
use roomcast_session::{RoomRegistry, WriteSerializer};

/// Which producer front the ingress publishes through.
pub enum ProducerMode {
    /// Synchronous publish per message; the ack reflects the send outcome.
    Single(Arc<QueueProducer>),

    /// Micro-batched publish; the ack is optimistic (accepted-into-batch).
    Batched(Arc<BatchPublisher>),
}

impl ProducerMode {
    /// Publish one message, returning whether it was accepted.
    pub async fn publish(&self, message: &QueueMessage) -> bool {
        match self {
            ProducerMode::Single(producer) => producer.publish(message).await,
            ProducerMode::Batched(publisher) => publisher.publish(message.clone()).await,
        }
    }
}

/// Handle to the wired fabric, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ingress: Arc<IngressMetrics>,
    pub registry: Arc<RoomRegistry>,
    pub serializer: Arc<WriteSerializer>,
    pub producer: Arc<QueueProducer>,
    pub producer_mode: Arc<ProducerMode>,
    pub consumer: Arc<ConsumerPool>,
    pub store: Arc<dyn MessageStore>,
    pub sources: Arc<SnapshotSources>,
    pub assigned_rooms: Arc<Vec<u32>>,
}

impl AppState {
    /// Whether `room_id` is a valid room in this deployment.
    pub fn valid_room(&self, room_id: u32) -> bool {
        (1..=self.config.node.rooms).contains(&room_id)
    }
}
