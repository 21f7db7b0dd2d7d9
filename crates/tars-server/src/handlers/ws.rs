//! WebSocket chat handler.
//!
//! Each inbound `user_message` frame produces, in order: an `ack` frame, a
//! `route_decision` frame, zero or more `final_response` chunks and a closing
//! `final_response` carrying `[DONE]`. A model failure sends one `error`
//! frame instead of the closing sentinel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::StreamExt;

use tars_core::{ClientFrame, ServerFrame, SessionId, DONE_SENTINEL};
use tars_store::{HistoryEntry, SessionHistory};

use crate::model::ModelBackend;
use crate::state::ServerState;

/// WebSocket connection handler.
///
/// Upgrades the connection and serves chat requests on it until the client
/// closes, the socket fails or the idle timeout expires.
pub async fn websocket_handler<M, H>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState<M, H>>>,
) -> Response
where
    M: ModelBackend + 'static,
    H: SessionHistory + 'static,
{
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket<M, H>(mut socket: WebSocket, state: Arc<ServerState<M, H>>)
where
    M: ModelBackend,
    H: SessionHistory,
{
    let idle_timeout = state.config.websocket_timeout();
    tracing::info!("WebSocket connection opened");

    loop {
        let msg = match tokio::time::timeout(idle_timeout, socket.recv()).await {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %e, "Error reading from client");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                tracing::info!(
                    timeout_seconds = idle_timeout.as_secs(),
                    "Closing idle WebSocket connection"
                );
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                if let Err(e) = handle_request(&mut socket, &state, &text).await {
                    tracing::debug!(error = %e, "Failed to send to client");
                    break;
                }
            }
            Message::Close(_) => {
                tracing::debug!("Client closed connection");
                break;
            }
            Message::Binary(_) => tracing::debug!("Ignoring binary frame"),
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    tracing::info!("WebSocket connection closed");
}

/// Serve one inbound text frame.
///
/// Only socket send failures are returned; everything else is reported to
/// the client as an `error` frame.
async fn handle_request<M, H>(
    socket: &mut WebSocket,
    state: &ServerState<M, H>,
    text: &str,
) -> Result<(), axum::Error>
where
    M: ModelBackend,
    H: SessionHistory,
{
    let (message, session_id) = match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::UserMessage {
            message,
            session_id,
        }) => (message, session_id),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected client frame");
            return send_frame(socket, &ServerFrame::error(format!("invalid request: {e}"))).await;
        }
    };

    tracing::info!(session_id = %session_id, chars = message.len(), "User message received");

    if let Err(e) = state
        .history
        .append(&session_id, HistoryEntry::user(message))
    {
        tracing::error!(session_id = %session_id, error = %e, "Failed to record user message");
        return send_frame(socket, &ServerFrame::error(e.to_string())).await;
    }

    let delay = state.config.phase_delay();
    send_frame(socket, &ServerFrame::ack(&state.config.ack_message)).await?;
    tokio::time::sleep(delay).await;
    send_frame(socket, &ServerFrame::route_decision(&state.config.route_message)).await?;
    tokio::time::sleep(delay).await;

    stream_reply(socket, state, &session_id).await
}

/// Stream the model reply for a session and record it once complete.
async fn stream_reply<M, H>(
    socket: &mut WebSocket,
    state: &ServerState<M, H>,
    session_id: &SessionId,
) -> Result<(), axum::Error>
where
    M: ModelBackend,
    H: SessionHistory,
{
    let history = match state.history.history(session_id) {
        Ok(history) => history,
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Failed to load history");
            return send_frame(socket, &ServerFrame::error(e.to_string())).await;
        }
    };

    let mut chunks = match state.model.stream_reply(&history).await {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::error!(
                session_id = %session_id,
                model = state.model.name(),
                error = %e,
                "Model failed to start reply"
            );
            return send_frame(socket, &ServerFrame::error(e.to_string())).await;
        }
    };

    let mut reply = String::new();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(chunk) if chunk == DONE_SENTINEL => {
                tracing::warn!(session_id = %session_id, "Dropping model chunk equal to the done sentinel");
            }
            Ok(chunk) => {
                reply.push_str(&chunk);
                send_frame(socket, &ServerFrame::final_response(chunk)).await?;
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Model stream failed");
                return send_frame(socket, &ServerFrame::error(e.to_string())).await;
            }
        }
    }

    send_frame(socket, &ServerFrame::done()).await?;
    tracing::debug!(session_id = %session_id, chars = reply.len(), "Reply complete");

    if let Err(e) = state
        .history
        .append(session_id, HistoryEntry::assistant(reply))
    {
        tracing::warn!(session_id = %session_id, error = %e, "Failed to record reply");
    }

    Ok(())
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) -> Result<(), axum::Error> {
    let text = serde_json::to_string(frame).map_err(axum::Error::new)?;
    socket.send(Message::Text(text)).await
}
