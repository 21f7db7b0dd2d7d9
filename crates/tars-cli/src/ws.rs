//! WebSocket connection to the TARS backend.
//!
//! This module owns the transport: it opens the socket, writes outgoing
//! `user_message` frames and hands every inbound text frame to the app
//! untouched. Interpreting frames is the reducer's job.
//!
//! Endpoint: WS /ws/agent

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tars_core::{ClientFrame, SessionId};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Delay unit for reconnect attempts. Attempt `n` waits `n - 1` units.
pub const RECONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// Error type for WebSocket operations.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// Failed to connect.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Failed to send message.
    #[error("Send failed: {0}")]
    Send(String),

    /// No connection is open.
    #[error("not connected")]
    NotConnected,

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle for sending text frames to the WebSocket.
#[derive(Debug, Clone)]
pub struct WsSender {
    tx: mpsc::Sender<String>,
}

impl WsSender {
    /// Queue a client frame for sending.
    pub async fn send_frame(&self, frame: &ClientFrame) -> Result<(), WsError> {
        let json = serde_json::to_string(frame)?;
        self.tx
            .send(json)
            .await
            .map_err(|e| WsError::Send(e.to_string()))
    }

    /// Whether the writer task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Events from the WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// Successfully connected.
    Connected,
    /// A text frame, exactly as received.
    Frame(String),
    /// Connection closed.
    Disconnected,
    /// The transport failed. A `Disconnected` follows.
    TransportError(String),
}

/// Spawn a WebSocket connection task.
///
/// Returns a sender for outgoing frames and a receiver for incoming events.
/// Dropping every sender closes the socket.
pub async fn connect(url: &str) -> Result<(WsSender, mpsc::Receiver<WsEvent>), WsError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| WsError::Connection(e.to_string()))?;

    tracing::info!(url = %url, "WebSocket connected");

    let (write, read) = ws_stream.split();

    // Channel for outgoing messages
    let (outgoing_tx, outgoing_rx) = mpsc::channel::<String>(32);

    // Channel for incoming events
    let (event_tx, event_rx) = mpsc::channel::<WsEvent>(128);

    tokio::spawn(ws_writer(write, outgoing_rx));
    tokio::spawn(ws_reader(read, event_tx));

    Ok((WsSender { tx: outgoing_tx }, event_rx))
}

/// Task that writes outgoing messages and closes the socket when the
/// senders are gone.
async fn ws_writer(mut write: SplitSink<Socket, Message>, mut rx: mpsc::Receiver<String>) {
    while let Some(text) = rx.recv().await {
        if let Err(e) = write.send(Message::Text(text)).await {
            tracing::warn!(error = %e, "WebSocket write failed");
            return;
        }
    }

    tracing::debug!("Closing WebSocket");
    let _ = write.send(Message::Close(None)).await;
}

/// Task that forwards inbound text frames as events.
async fn ws_reader(mut read: SplitStream<Socket>, tx: mpsc::Sender<WsEvent>) {
    let _ = tx.send(WsEvent::Connected).await;

    while let Some(result) = read.next().await {
        match result {
            Ok(Message::Text(text)) => {
                tracing::trace!(len = text.len(), "Frame received");
                if tx.send(WsEvent::Frame(text)).await.is_err() {
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(reason = ?frame, "Server closed connection");
                break;
            }
            // Ignore control frames and binary messages
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_) | Message::Binary(_)) => {}
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read failed");
                let _ = tx.send(WsEvent::TransportError(e.to_string())).await;
                break;
            }
        }
    }

    let _ = tx.send(WsEvent::Disconnected).await;
}

// =============================================================================
// Connection Manager
// =============================================================================

/// Owns the connection to one backend URL for one session.
#[derive(Debug)]
pub struct ConnectionManager {
    url: String,
    session_id: SessionId,
    sender: Option<WsSender>,
    reconnect_attempts: u32,
    backoff: Duration,
}

impl ConnectionManager {
    /// Create a manager. Nothing is opened until [`Self::connect`].
    #[must_use]
    pub fn new(url: impl Into<String>, session_id: SessionId, reconnect_attempts: u32) -> Self {
        Self {
            url: url.into(),
            session_id,
            sender: None,
            reconnect_attempts,
            backoff: RECONNECT_BACKOFF,
        }
    }

    /// Override the reconnect delay unit.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Backend URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Session attached to every outgoing message.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Whether a connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sender.as_ref().is_some_and(|s| !s.is_closed())
    }

    /// Open the connection, replacing any previous one.
    pub async fn connect(&mut self) -> Result<mpsc::Receiver<WsEvent>, WsError> {
        self.disconnect();
        let (sender, events) = connect(&self.url).await?;
        self.sender = Some(sender);
        Ok(events)
    }

    /// Reconnect with linear back-off.
    ///
    /// Tries at least once and at most `reconnect_attempts` times.
    pub async fn reconnect(&mut self) -> Result<mpsc::Receiver<WsEvent>, WsError> {
        let attempts = self.reconnect_attempts.max(1);
        let mut last_error = WsError::NotConnected;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.backoff * (attempt - 1)).await;
            }

            tracing::info!(url = %self.url, attempt, attempts, "Reconnecting");
            match self.connect().await {
                Ok(events) => return Ok(events),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Reconnect attempt failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Send a user message tagged with this session.
    pub async fn send(&self, message: &str) -> Result<(), WsError> {
        let sender = self.sender.as_ref().ok_or(WsError::NotConnected)?;
        let frame = ClientFrame::user_message(message, self.session_id.clone());
        sender.send_frame(&frame).await?;
        tracing::debug!(session_id = %self.session_id, chars = message.len(), "Message sent");
        Ok(())
    }

    /// Close the connection, if any.
    pub fn disconnect(&mut self) {
        if self.sender.take().is_some() {
            tracing::info!(url = %self.url, "Disconnecting");
        }
    }

    /// Forget the sender after the reader reported the socket gone.
    pub fn mark_disconnected(&mut self) {
        self.sender = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
