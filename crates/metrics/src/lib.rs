//! Roomcast metrics
//!
//! Every component keeps its own lock-free counters; this crate gathers
//! their snapshots into the single read-only document served by the
//! metrics surface, and runs the periodic summary reporter.

mod ingress;
mod reporter;
mod snapshot;

pub use ingress::{IngressMetrics, IngressMetricsSnapshot};
pub use reporter::Reporter;
pub use snapshot::{FabricSnapshot, SnapshotSources};
