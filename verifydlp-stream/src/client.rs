//! WebSocket client for the liveness service

use crate::error::StreamError;
use crate::protocol::ClientMessage;
use crate::session::{LivenessProtocol, StreamEvent};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Streaming client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Cadence of frame transmission
    #[serde(with = "verifydlp_core::config::duration_millis")]
    pub frame_interval: Duration,
    /// Outbound queue depth; frames beyond it are dropped
    pub outbound_buffer: usize,
    /// Handshake limit; `None` leaves it to the transport
    pub connect_timeout: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(200),
            outbound_buffer: 8,
            connect_timeout: None,
        }
    }
}

/// Supplies the payload for each frame tick
///
/// `None` skips the tick.
pub trait FramePayloadSource: Send + Sync + 'static {
    /// Base64 payload for this tick, if a frame is available
    fn next_payload(&self) -> Option<String>;
}

impl<F> FramePayloadSource for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn next_payload(&self) -> Option<String> {
        self()
    }
}

/// Receiver of events from one connection
pub type StreamEvents = mpsc::UnboundedReceiver<StreamEvent>;

/// One connection to the liveness service
///
/// Owns the socket tasks and at most one frame timer. Dropping the client
/// closes the connection.
pub struct StreamingClient {
    url: String,
    config: StreamConfig,
    outbound: Option<mpsc::Sender<Message>>,
    ready_tx: Arc<watch::Sender<bool>>,
    reader: Option<JoinHandle<()>>,
    frame_timer: Option<JoinHandle<()>>,
    started: bool,
    frames_sent: Arc<AtomicU64>,
}

impl StreamingClient {
    /// Open the connection and start the socket tasks
    pub async fn connect(
        url: &str,
        config: StreamConfig,
    ) -> Result<(Self, StreamEvents), StreamError> {
        let handshake = connect_async(url);
        let result = match config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake).await.map_err(|_| {
                StreamError::ConnectTimeout {
                    url: url.to_string(),
                    duration: limit,
                }
            })?,
            None => handshake.await,
        };
        let (ws_stream, _) = result.map_err(|e| StreamError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        info!("Connected to liveness service at {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(config.outbound_buffer.max(1));
        let (ready_tx, _) = watch::channel(true);
        let ready_tx = Arc::new(ready_tx);

        // Writer ends when every sender is gone, closing the socket politely.
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = write.send(message).await {
                    warn!("Failed to send to liveness service: {}", e);
                    break;
                }
            }
            if let Err(e) = write.close().await {
                debug!("Socket close: {}", e);
            }
        });

        let reader_ready = Arc::clone(&ready_tx);
        let reader_events = event_tx.clone();
        let reader = tokio::spawn(async move {
            let mut protocol = LivenessProtocol::new();
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if let Some(event) = protocol.handle_text(&text) {
                            if reader_events.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        debug!("Liveness service closed the connection: {:?}", frame);
                        break;
                    }
                    Ok(_) => {
                        // Binary, Ping and Pong carry nothing for us
                    }
                    Err(e) => {
                        warn!("Liveness connection error: {}", e);
                        reader_ready.send_replace(false);
                        let _ = reader_events.send(StreamEvent::TransportError {
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }
            reader_ready.send_replace(false);
            let _ = reader_events.send(StreamEvent::Closed);
        });

        let _ = event_tx.send(StreamEvent::Opened);

        Ok((
            Self {
                url: url.to_string(),
                config,
                outbound: Some(outbound_tx),
                ready_tx,
                reader: Some(reader),
                frame_timer: None,
                started: false,
                frames_sent: Arc::new(AtomicU64::new(0)),
            },
            event_rx,
        ))
    }

    /// Send the start command and arm the frame timer
    ///
    /// The start command goes out once per connection; later calls are no-ops
    /// while the timer runs.
    pub async fn begin_streaming(
        &mut self,
        source: Arc<dyn FramePayloadSource>,
    ) -> Result<(), StreamError> {
        let outbound = self.outbound.clone().ok_or(StreamError::NotConnected)?;
        if !self.is_ready() {
            return Err(StreamError::NotReady);
        }
        if self.started {
            debug!("Liveness streaming already started");
            return Ok(());
        }

        let start = serde_json::to_string(&ClientMessage::start_verification())?;
        outbound
            .send(Message::Text(start))
            .await
            .map_err(|e| StreamError::Send {
                reason: e.to_string(),
            })?;
        self.started = true;
        info!(
            "Sent start_verification, streaming frames every {:?}",
            self.config.frame_interval
        );

        let interval = self.config.frame_interval;
        let frames_sent = Arc::clone(&self.frames_sent);
        let ready = self.ready_tx.subscribe();
        self.frame_timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !*ready.borrow() {
                    debug!("Connection no longer ready, frame timer stopping");
                    break;
                }
                let Some(payload) = source.next_payload() else {
                    continue;
                };
                let text = match serde_json::to_string(&ClientMessage::frame(payload)) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to serialize frame: {}", e);
                        continue;
                    }
                };
                match outbound.try_send(Message::Text(text)) {
                    Ok(()) => {
                        frames_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(TrySendError::Full(_)) => debug!("Outbound queue full, dropping frame"),
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        }));

        Ok(())
    }

    /// Clear the frame timer
    pub fn stop_streaming(&mut self) {
        if let Some(timer) = self.frame_timer.take() {
            timer.abort();
            debug!("Frame timer cleared");
        }
    }

    /// Close the connection immediately
    ///
    /// In-flight frames are not drained. Safe to call more than once.
    pub fn close(&mut self) {
        self.stop_streaming();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if self.outbound.take().is_some() {
            info!("Closing liveness connection to {}", self.url);
        }
        self.ready_tx.send_replace(false);
    }

    /// Whether the connection is open and usable
    pub fn is_ready(&self) -> bool {
        self.outbound.is_some() && *self.ready_tx.borrow()
    }

    /// Whether a frame timer is currently running
    pub fn is_streaming(&self) -> bool {
        self.frame_timer
            .as_ref()
            .map_or(false, |timer| !timer.is_finished())
    }

    /// Whether the start command has been sent on this connection
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Number of frames queued for transmission so far
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Service address
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for StreamingClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StreamingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingClient")
            .field("url", &self.url)
            .field("ready", &self.is_ready())
            .field("started", &self.started)
            .field("streaming", &self.is_streaming())
            .finish()
    }
}
