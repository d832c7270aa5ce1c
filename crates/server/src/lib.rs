//! Roomcast server
//!
//! Wires the fabric together: WebSocket ingress at `/chat/{room_id}`, the
//! health/metrics surface, and the pipeline components behind them. The
//! binary lives in `main.rs`; this library exists so integration tests can
//! build the same fabric against in-process collaborators.

pub mod http;
pub mod ingress;
pub mod serve;
pub mod state;
