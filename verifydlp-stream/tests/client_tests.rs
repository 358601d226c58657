//! Integration tests for the streaming client
//!
//! Each test runs an in-process WebSocket server scripting the liveness
//! service, and drives a real `StreamingClient` against it.

use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use verifydlp_stream::*;

type ServerSocket = WebSocketStream<TcpStream>;

/// Start a one-connection server running `script`, return its ws:// address
async fn spawn_service<F, Fut>(script: F) -> String
where
    F: FnOnce(ServerSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = accept_async(stream).await {
                script(ws).await;
            }
        }
    });
    format!("ws://{}/stream-liveness", addr)
}

/// Server that forwards every text message it receives and never replies
async fn spawn_recording_service() -> (String, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let url = spawn_service(move |mut ws| async move {
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => {
                    let _ = tx.send(text);
                }
                Message::Close(_) => {
                    let _ = tx.send("<close>".to_string());
                    break;
                }
                _ => {}
            }
        }
    })
    .await;
    (url, rx)
}

fn fast_config() -> StreamConfig {
    StreamConfig {
        frame_interval: Duration::from_millis(20),
        ..StreamConfig::default()
    }
}

async fn next_event(events: &mut StreamEvents) -> StreamEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event within timeout")
        .expect("event channel open")
}

async fn next_text(received: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("message within timeout")
        .expect("server alive")
}

fn constant_source() -> Arc<dyn FramePayloadSource> {
    Arc::new(|| Some("QUJD".to_string()))
}

#[tokio::test]
async fn test_stream_config_default() {
    let config = StreamConfig::default();
    assert_eq!(config.frame_interval, Duration::from_millis(200));
    assert!(config.connect_timeout.is_none());
}

#[tokio::test]
async fn test_connect_reports_open_then_service_status() {
    let url = spawn_service(|mut ws| async move {
        ws.send(Message::Text(r#"{"status":"CONNECTED","message":"ready"}"#.to_string()))
            .await
            .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let (client, mut events) = StreamingClient::connect(&url, fast_config()).await.unwrap();
    assert!(client.is_ready());
    assert_eq!(next_event(&mut events).await, StreamEvent::Opened);
    assert_eq!(next_event(&mut events).await, StreamEvent::Connected);
}

#[tokio::test]
async fn test_start_command_sent_once_then_frames() {
    let (url, mut received) = spawn_recording_service().await;
    let (mut client, _events) = StreamingClient::connect(&url, fast_config()).await.unwrap();

    tokio_test::assert_ok!(client.begin_streaming(constant_source()).await);
    tokio_test::assert_ok!(client.begin_streaming(constant_source()).await);
    assert!(client.has_started());
    assert!(client.is_streaming());

    assert_eq!(
        next_text(&mut received).await,
        r#"{"command":"start_verification"}"#
    );
    for _ in 0..3 {
        assert_eq!(next_text(&mut received).await, r#"{"frame":"QUJD"}"#);
    }
    assert!(client.frames_sent() >= 3);
}

#[tokio::test]
async fn test_ticks_without_payload_are_skipped() {
    let (url, mut received) = spawn_recording_service().await;
    let (mut client, _events) = StreamingClient::connect(&url, fast_config()).await.unwrap();

    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let source: Arc<dyn FramePayloadSource> = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        None
    });
    client.begin_streaming(source).await.unwrap();

    assert_eq!(
        next_text(&mut received).await,
        r#"{"command":"start_verification"}"#
    );
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(ticks.load(Ordering::SeqCst) >= 3);
    assert!(received.try_recv().is_err());
    assert_eq!(client.frames_sent(), 0);
}

#[tokio::test]
async fn test_close_clears_timer_and_stops_frames() {
    let (url, mut received) = spawn_recording_service().await;
    let (mut client, _events) = StreamingClient::connect(&url, fast_config()).await.unwrap();

    client.begin_streaming(constant_source()).await.unwrap();
    next_text(&mut received).await;
    next_text(&mut received).await;

    client.close();
    client.close();
    assert!(!client.is_streaming());
    assert!(!client.is_ready());

    // Drain what was in flight; the socket must then close with no more frames.
    loop {
        let text = next_text(&mut received).await;
        if text == "<close>" {
            break;
        }
        assert_eq!(text, r#"{"frame":"QUJD"}"#);
    }
    let sent_at_close = client.frames_sent();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.frames_sent(), sent_at_close);

    let err = tokio_test::assert_err!(client.begin_streaming(constant_source()).await);
    assert!(matches!(err, StreamError::NotConnected));
}

#[tokio::test]
async fn test_server_close_flips_readiness_and_stops_timer() {
    let url = spawn_service(|mut ws| async move {
        // Wait for the start command and one frame, then hang up.
        let _ = ws.next().await;
        let _ = ws.next().await;
        let _ = ws.close(None).await;
    })
    .await;

    let (mut client, mut events) = StreamingClient::connect(&url, fast_config()).await.unwrap();
    assert_eq!(next_event(&mut events).await, StreamEvent::Opened);
    client.begin_streaming(constant_source()).await.unwrap();

    assert_eq!(next_event(&mut events).await, StreamEvent::Closed);
    assert!(!client.is_ready());

    timeout(Duration::from_secs(2), async {
        while client.is_streaming() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("frame timer should stop after the connection closes");
}

#[tokio::test]
async fn test_two_stage_conversation_over_the_wire() {
    let url = spawn_service(|mut ws| async move {
        ws.send(Message::Text(r#"{"status":"CONNECTED"}"#.to_string()))
            .await
            .unwrap();
        // start_verification
        let _ = ws.next().await;
        for count in 1..=5 {
            let text = format!(r#"{{"status":"ANALYZING","consecutive_real":{}}}"#, count);
            ws.send(Message::Text(text)).await.unwrap();
        }
        ws.send(Message::Text("garbage".to_string())).await.unwrap();
        ws.send(Message::Text(r#"{"status":"VERIFIED"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(
            r#"{"status":"SUCCESS","session_id":"abc123"}"#.to_string(),
        ))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;

    let (mut client, mut events) = StreamingClient::connect(&url, fast_config()).await.unwrap();
    assert_eq!(next_event(&mut events).await, StreamEvent::Opened);
    assert_eq!(next_event(&mut events).await, StreamEvent::Connected);
    client.begin_streaming(constant_source()).await.unwrap();

    for count in 1..=5 {
        assert_eq!(
            next_event(&mut events).await,
            StreamEvent::Progress {
                consecutive_real: count
            }
        );
    }
    assert_eq!(
        next_event(&mut events).await,
        StreamEvent::LivenessVerified { session_id: None }
    );
    assert_eq!(
        next_event(&mut events).await,
        StreamEvent::Finalized {
            session_id: Some("abc123".to_string())
        }
    );
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("ws://{}/stream-liveness", addr);
    let err = StreamingClient::connect(&url, fast_config())
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::Connect { .. }));
}
