//! WebSocket ingress
//!
//! Accepts socket upgrades at `/chat/{room_id}`, parses and validates each
//! inbound frame, hands accepted messages to the producer, and enqueues
//! the ack on the session's write queue. Acceptance means "accepted by
//! this node for ordered delivery" - fan-out happens downstream via the
//! queue and the consumers, never inline.
//!
//! All outbound frames (acks, errors, broadcasts) go through the write
//! serializer; nothing writes to the socket directly except the serializer
//! workers draining this session's transport.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;

use roomcast_protocol::{validate_frame, ChatFrame, MessageResponse, QueueMessage};
use roomcast_session::{FrameTransport, Session};

use crate::state::AppState;

/// Outbound half of an accepted WebSocket.
///
/// The mutex is uncontended in practice: the write serializer guarantees a
/// single concurrent writer per session.
pub struct WsTransport {
    sink: tokio::sync::Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl FrameTransport for WsTransport {
    async fn send_text(&self, text: &str) -> std::io::Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.to_string()))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
    }
}

/// Upgrade handler for `/chat/{room_id}`.
///
/// A room id that is not an integer in range is rejected before the
/// upgrade completes.
pub async fn chat_upgrade(
    Path(room_id): Path<String>,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let room_id = match room_id.parse::<u32>() {
        Ok(room_id) if state.valid_room(room_id) => room_id,
        _ => {
            tracing::warn!(room = %room_id, peer = %peer, "rejected connection to invalid room");
            return (StatusCode::NOT_FOUND, "unknown room").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, peer, state))
}

/// Lifecycle of one accepted connection.
async fn handle_socket(socket: WebSocket, room_id: u32, peer: SocketAddr, state: AppState) {
    let (sink, mut stream) = socket.split();
    let transport = Arc::new(WsTransport {
        sink: tokio::sync::Mutex::new(sink),
    });

    let session = Session::new(
        room_id,
        state.config.session.write_queue_capacity,
        transport as Arc<dyn FrameTransport>,
    );
    state.registry.add(Arc::clone(&session));
    state.ingress.connection_opened();

    tracing::info!(
        session_id = session.id(),
        room_id,
        peer = %peer,
        "connection established"
    );

    let client_ip = peer.ip().to_string();
    while let Some(next) = stream.next().await {
        match next {
            Ok(Message::Text(text)) => {
                handle_frame(&state, &session, &text, &client_ip).await;
            }
            Ok(Message::Close(_)) => break,
            // Pings are answered by axum; binary frames have no meaning here.
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(session_id = session.id(), error = %e, "transport error");
                break;
            }
        }
    }

    // CLOSED is terminal: discard queued frames and prune the registry.
    let dropped = session.close();
    if dropped > 0 {
        state.serializer.metrics().record_dropped(dropped as u64);
    }
    state.registry.remove(&session);
    state.ingress.connection_closed();

    tracing::info!(session_id = session.id(), room_id, "connection closed");
}

/// Process one inbound text frame.
///
/// Every exit path either enqueues an ack or an error response; malformed
/// or invalid frames never close the connection.
pub async fn handle_frame(state: &AppState, session: &Arc<Session>, text: &str, client_ip: &str) {
    state.ingress.record_received();

    let frame = match ChatFrame::from_json(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(session_id = session.id(), error = %e, "malformed frame");
            state.ingress.record_failed();
            send_response(state, session, &MessageResponse::error("Invalid message format"));
            return;
        }
    };

    if let Err(reason) = validate_frame(&frame) {
        tracing::debug!(session_id = session.id(), reason = %reason, "frame failed validation");
        state.ingress.record_failed();
        send_response(state, session, &MessageResponse::error(reason.0));
        return;
    }

    // Remember the sender for optional broadcast exclusion.
    session.set_user_id(&frame.user_id);

    let message = QueueMessage::from_frame(
        &frame,
        session.room_id(),
        &state.config.node.node_id,
        client_ip,
    );

    if state.producer_mode.publish(&message).await {
        state.ingress.record_published();
        let ack = MessageResponse::success(&message.message_id, &frame);
        if state.serializer.send(session, ack.to_json()) {
            state.ingress.record_ack_sent();
        } else {
            state.ingress.record_ack_failed();
        }
    } else {
        state.ingress.record_failed();
        send_response(state, session, &MessageResponse::error("Failed to queue message"));
    }
}

fn send_response(state: &AppState, session: &Arc<Session>, response: &MessageResponse) {
    if !state.serializer.send(session, response.to_json()) {
        state.ingress.record_ack_failed();
    }
}
