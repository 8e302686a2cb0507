// Connection lifecycle and wire-format tests
//
// These run the real driver against a local WebSocket server (or a port
// with nothing listening, for the failure paths).

use emocam_client::{ConnectionManager, ConnectionState, Envelope, FrameTransport, ReconnectPolicy};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tungstenite::Message;

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        max_attempts: 5,
        delay: Duration::from_millis(10),
    }
}

/// Bind and immediately drop a listener so the port refuses connections.
async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{}/stream", port)
}

async fn wait_for_state(
    manager: &ConnectionManager,
    expected: ConnectionState,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if manager.state() == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[test]
fn test_initial_state_is_disconnected() {
    let manager = ConnectionManager::new("ws://localhost:5000/stream", ReconnectPolicy::default());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[test]
fn test_default_policy_matches_service_contract() {
    let policy = ReconnectPolicy::default();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.delay, Duration::from_millis(1000));
}

#[tokio::test]
async fn test_exhausted_attempts_enter_failed_and_stay_there() {
    let manager = Arc::new(ConnectionManager::new(refused_url().await, fast_policy()));

    manager.connect();

    assert!(
        wait_for_state(&manager, ConnectionState::Failed, Duration::from_secs(5)).await,
        "expected Failed after bounded retries"
    );

    // No further automatic attempts once Failed
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(manager.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_send_while_disconnected_is_a_silent_drop() {
    let manager = ConnectionManager::new("ws://127.0.0.1:1/stream", ReconnectPolicy::default());

    // Must not block, panic, or change state
    manager.send("audio_stream", json!({ "chunk": "AAAA" }));
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_explicit_connect_restarts_after_failed() {
    let manager = Arc::new(ConnectionManager::new(refused_url().await, fast_policy()));

    manager.connect();
    assert!(wait_for_state(&manager, ConnectionState::Failed, Duration::from_secs(5)).await);

    // A new connect() leaves Failed and retries
    manager.connect();
    let left_failed = {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = false;
        while Instant::now() < deadline {
            if manager.state() != ConnectionState::Failed {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        seen
    };
    assert!(left_failed, "connect() after Failed should re-initiate");
}

#[tokio::test]
async fn test_connects_and_dispatches_named_events() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Server: accept one client, deliver a partial transcript, then echo
    // back the first envelope the client sends.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut tx, mut rx) = socket.split();

        let event = json!({ "event": "partial", "data": { "text": "he" } });
        tx.send(Message::Text(event.to_string())).await.unwrap();

        while let Some(Ok(message)) = rx.next().await {
            if let Message::Text(text) = message {
                return serde_json::from_str::<Envelope>(&text).unwrap();
            }
        }
        panic!("client never sent an envelope");
    });

    let manager = Arc::new(ConnectionManager::new(
        format!("ws://127.0.0.1:{}/stream", port),
        fast_policy(),
    ));

    let received = Arc::new(Mutex::new(Vec::<serde_json::Value>::new()));
    let sink = Arc::clone(&received);
    manager.on("partial", move |data| {
        sink.lock().unwrap().push(data);
    });

    manager.connect();
    assert!(wait_for_state(&manager, ConnectionState::Connected, Duration::from_secs(5)).await);

    // Inbound event reaches the registered handler
    let deadline = Instant::now() + Duration::from_secs(5);
    while received.lock().unwrap().is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let events = received.lock().unwrap().clone();
    assert_eq!(events, vec![json!({ "text": "he" })]);

    // Outbound send travels as an {event, data} envelope
    manager.send("audio_stream", json!({ "chunk": "AAAA", "sequence": 0 }));

    let envelope = server.await.unwrap();
    assert_eq!(envelope.event, "audio_stream");
    assert_eq!(envelope.data["chunk"], "AAAA");
}

#[tokio::test]
async fn test_reconnect_after_link_loss_flushes_buffered_frames_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        // First connection: complete the handshake, hold the link long
        // enough for the client to observe Connected, then drop it
        let (stream, _) = listener.accept().await.unwrap();
        let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        drop(socket);

        // Second connection: collect the audio_stream envelopes
        let (stream, _) = listener.accept().await.unwrap();
        let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (_tx, mut rx) = socket.split();

        let mut sequences = Vec::new();
        while sequences.len() < 4 {
            match rx.next().await {
                Some(Ok(Message::Text(text))) => {
                    let envelope: Envelope = serde_json::from_str(&text).unwrap();
                    assert_eq!(envelope.event, "audio_stream");
                    sequences.push(envelope.data["sequence"].as_u64().unwrap());
                }
                Some(Ok(_)) => {}
                other => panic!("socket ended after {:?}: {:?}", sequences, other),
            }
        }
        sequences
    });

    // A wide retry delay keeps the outage window observable
    let manager = Arc::new(ConnectionManager::new(
        format!("ws://127.0.0.1:{}/stream", port),
        ReconnectPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(200),
        },
    ));
    let mut transport = FrameTransport::new(Arc::clone(&manager), 5);

    manager.connect();
    assert!(wait_for_state(&manager, ConnectionState::Connected, Duration::from_secs(5)).await);

    // Wait for the driver to notice the dropped socket
    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.state() == ConnectionState::Connected && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(manager.state(), ConnectionState::Reconnecting);

    // Frames sent during the outage land in the ring
    for i in 0..3u8 {
        transport.send_frame(&[i]);
    }
    assert_eq!(transport.pending_len(), 3);

    // A bounded retry succeeds against the second accept
    assert!(
        wait_for_state(&manager, ConnectionState::Connected, Duration::from_secs(5)).await,
        "expected the retry to reach Connected"
    );

    // The next send flushes the buffered frames first, then itself
    transport.send_frame(&[3]);
    assert_eq!(transport.pending_len(), 0);

    let sequences = server.await.unwrap();
    assert_eq!(sequences, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_malformed_inbound_message_is_ignored() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut tx, _rx) = socket.split();

        tx.send(Message::Text("not json at all".to_string()))
            .await
            .unwrap();
        let event = json!({ "event": "transcription", "data": { "text": "still fine" } });
        tx.send(Message::Text(event.to_string())).await.unwrap();

        // Hold the socket open until the test finishes
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let manager = Arc::new(ConnectionManager::new(
        format!("ws://127.0.0.1:{}/stream", port),
        fast_policy(),
    ));

    let received = Arc::new(Mutex::new(Vec::<serde_json::Value>::new()));
    let sink = Arc::clone(&received);
    manager.on("transcription", move |data| {
        sink.lock().unwrap().push(data);
    });

    manager.connect();
    assert!(wait_for_state(&manager, ConnectionState::Connected, Duration::from_secs(5)).await);

    // The garbage message is dropped; the next valid one still arrives
    let deadline = Instant::now() + Duration::from_secs(5);
    while received.lock().unwrap().is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let events = received.lock().unwrap().clone();
    assert_eq!(events, vec![json!({ "text": "still fine" })]);
    assert_eq!(manager.state(), ConnectionState::Connected);

    server.abort();
}
