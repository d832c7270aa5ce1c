//! Roomcast pipeline
//!
//! The path between a node and the external queue: the [`partitioner`]
//! deciding which rooms this node owns, the [`QueueProducer`] (and its
//! optional micro-batching [`BatchPublisher`]) on the way in, and the
//! [`ConsumerPool`] long-polling owned rooms on the way out.
//!
//! # Ordering
//!
//! The external queue preserves FIFO per room partition; producers append
//! in submission order, so consumers observe per-room FIFO per originating
//! node. No order is promised across rooms or across nodes.

mod batch_publisher;
mod consumer;
mod metrics;
pub mod partitioner;
mod producer;

pub use batch_publisher::BatchPublisher;
pub use consumer::ConsumerPool;
pub use metrics::{
    BatchProducerMetrics, BatchProducerMetricsSnapshot, ConsumerMetrics,
    ConsumerMetricsSnapshot, ProducerMetrics, ProducerMetricsSnapshot,
};
pub use producer::QueueProducer;
