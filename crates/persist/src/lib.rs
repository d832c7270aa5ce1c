//! Roomcast persistence
//!
//! The asynchronous write path behind the consumers: a bounded buffer and a
//! single flusher that turns the message stream into batched, idempotent
//! database writes, with a dead-letter queue for batches the store rejects.
//!
//! Persistence is optional. Without a configured database the batch writer
//! runs against [`NoopStore`] and messages are broadcast but not persisted.

mod dlq;
mod error;
mod metrics;
mod postgres;
mod store;
pub mod test_support;
mod writer;

pub use dlq::DeadLetterSink;
pub use error::StoreError;
pub use metrics::{
    BatchWriterMetrics, BatchWriterMetricsSnapshot, DlqMetrics, DlqMetricsSnapshot,
};
pub use postgres::PostgresStore;
pub use store::{MessageStore, NoopStore, UserActivityRow};
pub use writer::{BatchWriter, BatchWriterHandle};
