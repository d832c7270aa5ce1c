//! End-to-end fabric tests
//!
//! Build the same fabric the binary runs - in-process queue, no database -
//! and drive frames through the ingress path with recording transports in
//! place of real sockets.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use roomcast::ingress;
use roomcast::serve::{build_fabric, build_queue_client, Fabric};
use roomcast_config::Config;
use roomcast_protocol::QueueMessage;
use roomcast_session::{FrameTransport, Session};

#[derive(Default)]
struct RecordingTransport {
    frames: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    /// Broadcast envelopes only (acks and errors carry a `status` field).
    fn broadcasts(&self) -> Vec<QueueMessage> {
        self.frames()
            .iter()
            .filter_map(|frame| {
                let value: Value = serde_json::from_str(frame).ok()?;
                if value.get("status").is_some() {
                    return None;
                }
                QueueMessage::from_json(frame).ok()
            })
            .collect()
    }

    /// Ack/error responses only.
    fn responses(&self) -> Vec<Value> {
        self.frames()
            .iter()
            .filter_map(|frame| {
                let value: Value = serde_json::from_str(frame).ok()?;
                value.get("status").is_some().then_some(value)
            })
            .collect()
    }
}

#[async_trait]
impl FrameTransport for RecordingTransport {
    async fn send_text(&self, text: &str) -> std::io::Result<()> {
        self.frames.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

async fn test_fabric() -> Fabric {
    let config = Config::default();
    let queue = build_queue_client(&config).await.unwrap();
    build_fabric(config, queue).await.unwrap()
}

fn connect(fabric: &Fabric, room_id: u32) -> (Arc<Session>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let session = Session::new(
        room_id,
        fabric.state.config.session.write_queue_capacity,
        transport.clone() as Arc<dyn FrameTransport>,
    );
    fabric.state.registry.add(Arc::clone(&session));
    (session, transport)
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

const VALID_FRAME: &str = r#"{"userId":"42","username":"alice","message":"hi","timestamp":"2025-01-01T00:00:00Z","messageType":"TEXT"}"#;

#[tokio::test]
async fn valid_frame_is_acked_with_the_original_echoed() {
    let fabric = test_fabric().await;
    let (session, transport) = connect(&fabric, 5);

    ingress::handle_frame(&fabric.state, &session, VALID_FRAME, "10.0.0.1").await;

    wait_for(|| !transport.responses().is_empty()).await;
    let ack = &transport.responses()[0];
    assert_eq!(ack["status"], "SUCCESS");

    // The echoed original is deeply equal to what was sent.
    let expected: Value = serde_json::from_str(VALID_FRAME).unwrap();
    assert_eq!(ack["originalMessage"], expected);

    // messageId is a v4 UUID.
    let message_id = ack["messageId"].as_str().unwrap();
    let parsed = uuid::Uuid::parse_str(message_id).unwrap();
    assert_eq!(parsed.get_version_num(), 4);

    let snapshot = fabric.state.sources.collect();
    assert_eq!(snapshot.messages_received, 1);
    assert_eq!(snapshot.messages_published, 1);
    assert_eq!(snapshot.acks_sent, 1);

    fabric.cancel.cancel();
}

#[tokio::test]
async fn invalid_frame_gets_error_and_connection_survives() {
    let fabric = test_fabric().await;
    let (session, transport) = connect(&fabric, 5);

    // Username too short.
    let invalid = r#"{"userId":"42","username":"al","message":"x","timestamp":"2025-01-01T00:00:00Z","messageType":"TEXT"}"#;
    ingress::handle_frame(&fabric.state, &session, invalid, "10.0.0.1").await;

    wait_for(|| !transport.responses().is_empty()).await;
    let error = &transport.responses()[0];
    assert_eq!(error["status"], "ERROR");
    assert_eq!(error["errorMessage"], "username must be 3-20 characters");
    assert_eq!(fabric.state.sources.collect().messages_failed, 1);

    // The same socket still accepts valid frames afterwards.
    assert!(session.is_open());
    ingress::handle_frame(&fabric.state, &session, VALID_FRAME, "10.0.0.1").await;
    wait_for(|| transport.responses().len() == 2).await;
    assert_eq!(transport.responses()[1]["status"], "SUCCESS");

    fabric.cancel.cancel();
}

#[tokio::test]
async fn malformed_json_gets_error_without_closing() {
    let fabric = test_fabric().await;
    let (session, transport) = connect(&fabric, 3);

    ingress::handle_frame(&fabric.state, &session, "{definitely not json", "10.0.0.1").await;

    wait_for(|| !transport.responses().is_empty()).await;
    assert_eq!(transport.responses()[0]["status"], "ERROR");
    assert_eq!(transport.responses()[0]["errorMessage"], "Invalid message format");
    assert!(session.is_open());
    assert_eq!(fabric.state.sources.collect().messages_failed, 1);

    fabric.cancel.cancel();
}

#[tokio::test]
async fn room_broadcasts_arrive_in_submission_order() {
    let fabric = test_fabric().await;
    let (sender, _sender_transport) = connect(&fabric, 7);
    let (_receiver, receiver_transport) = connect(&fabric, 7);

    for i in 1..=3 {
        let frame = format!(
            r#"{{"userId":"42","username":"alice","message":"M{i}","timestamp":"2025-01-01T00:00:00Z","messageType":"TEXT"}}"#
        );
        ingress::handle_frame(&fabric.state, &sender, &frame, "10.0.0.1").await;
    }

    // The consumer pulls the room queue and fans out to the second socket.
    wait_for(|| receiver_transport.broadcasts().len() == 3).await;
    let texts: Vec<String> = receiver_transport
        .broadcasts()
        .iter()
        .map(|m| m.message.clone())
        .collect();
    assert_eq!(texts, vec!["M1", "M2", "M3"]);

    // Broadcast envelopes carry the full queue-message shape.
    let first = &receiver_transport.broadcasts()[0];
    assert_eq!(first.room_id, 7);
    assert_eq!(first.username, "alice");
    assert_eq!(first.server_id, "node-1");

    fabric.cancel.cancel();
}

#[tokio::test]
async fn broadcasts_stay_within_their_room() {
    let fabric = test_fabric().await;
    let (sender, _) = connect(&fabric, 1);
    let (_other_room, other_transport) = connect(&fabric, 2);

    ingress::handle_frame(&fabric.state, &sender, VALID_FRAME, "10.0.0.1").await;

    // Give the pipeline time to deliver anywhere it was going to.
    wait_for(|| fabric.state.sources.collect().consumer_processed >= 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(other_transport.broadcasts().is_empty());

    fabric.cancel.cancel();
}

#[tokio::test]
async fn sender_receives_own_broadcast_by_default() {
    let fabric = test_fabric().await;
    let (sender, transport) = connect(&fabric, 9);

    ingress::handle_frame(&fabric.state, &sender, VALID_FRAME, "10.0.0.1").await;

    // Ack plus the broadcast envelope, since exclusion is off by default.
    wait_for(|| transport.broadcasts().len() == 1 && transport.responses().len() == 1).await;

    fabric.cancel.cancel();
}
