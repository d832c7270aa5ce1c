//! Health and metrics surface
//!
//! Read-only endpoints beside the chat socket: liveness with database
//! reachability, the full counter suite, per-room queue depths, and the
//! partition assignment of the fleet.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use roomcast_pipeline::partitioner;

use crate::ingress;
use crate::state::AppState;

/// Build the full router: chat upgrade plus the read-only surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat/:room_id", get(ingress::chat_upgrade))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/metrics/queues", get(queue_depths))
        .route("/metrics/partition", get(partition_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Liveness plus database reachability.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = if state.store.health_check().await {
        "UP"
    } else {
        "DOWN"
    };

    Json(json!({
        "status": "UP",
        "nodeId": state.config.node.node_id.clone(),
        "database": database,
        "activeRooms": state.registry.active_rooms(),
        "totalSessions": state.registry.total_sessions(),
    }))
}

/// The full counter suite.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let mut document = serde_json::to_value(state.sources.collect()).unwrap_or_default();
    if let Some(map) = document.as_object_mut() {
        map.insert(
            "roomSessions".into(),
            state
                .registry
                .room_stats()
                .into_iter()
                .map(|(room, sessions)| (room.to_string(), json!(sessions)))
                .collect::<serde_json::Map<String, serde_json::Value>>()
                .into(),
        );
    }
    Json(document)
}

/// Approximate queue depths, fetched on request.
async fn queue_depths(State(state): State<AppState>) -> impl IntoResponse {
    let mut depths = serde_json::Map::new();
    for room_id in 1..=state.config.node.rooms {
        if let Some(attrs) = state.producer.queue_attributes(room_id).await {
            depths.insert(
                room_id.to_string(),
                json!({
                    "approxMessages": attrs.approx_messages,
                    "approxNotVisible": attrs.approx_not_visible,
                    "approxDelayed": attrs.approx_delayed,
                }),
            );
        }
    }
    Json(serde_json::Value::Object(depths))
}

/// Partition assignment for this node and the whole fleet.
async fn partition_status(State(state): State<AppState>) -> impl IntoResponse {
    let node = &state.config.node;
    let assignments: serde_json::Map<String, serde_json::Value> =
        partitioner::all_assignments(&node.node_list, node.rooms)
            .into_iter()
            .map(|(node_id, rooms)| (node_id, json!(rooms)))
            .collect();

    Json(json!({
        "enabled": node.partitioning_enabled(),
        "nodeId": node.node_id.clone(),
        "nodeList": node.node_list.clone(),
        "assignedRooms": state.assigned_rooms.as_slice(),
        "allAssignments": assignments,
    }))
}
