//! End-to-end tests of the chat WebSocket.
//!
//! Each test binds a real server to an ephemeral port and talks to it with a
//! `tokio-tungstenite` client, feeding every frame into a `StreamReducer`
//! the way the terminal client does.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tars_core::{classify, ClientFrame, EventKind, SessionId, StreamReducer, TurnStatus};
use tars_server::{
    create_router, EchoBackend, ModelBackend, ModelError, ModelStream, ServerConfig, ServerState,
};
use tars_store::{HistoryEntry, MemoryHistory, Role, SessionHistory};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Harness
// =============================================================================

fn test_config() -> ServerConfig {
    ServerConfig {
        phase_delay_ms: 0,
        ..ServerConfig::default()
    }
}

/// Start a server and return its WebSocket URL.
async fn spawn_server<M>(model: M, history: Arc<MemoryHistory>) -> String
where
    M: ModelBackend + 'static,
{
    let app = create_router(ServerState::new(Arc::new(model), history, test_config()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{addr}/ws/agent")
}

async fn connect(url: &str) -> Client {
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

async fn send_text(client: &mut Client, text: String) {
    client.send(Message::Text(text)).await.unwrap();
}

async fn send_user_message(client: &mut Client, message: &str, session: &SessionId) {
    let frame = ClientFrame::user_message(message, session.clone());
    send_text(client, serde_json::to_string(&frame).unwrap()).await;
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return text;
        }
    }
}

/// Read frames into the reducer until the current turn closes.
async fn read_turn(client: &mut Client, reducer: &mut StreamReducer) -> Vec<String> {
    let mut kinds = Vec::new();
    while reducer.has_open_turn() {
        let text = next_text(client).await;
        kinds.push(classify(&text).unwrap().kind.as_str().to_string());
        reducer.apply_raw(&text);
    }
    kinds
}

/// Backend that streams a fixed prefix and then fails.
struct FailingBackend;

#[async_trait]
impl ModelBackend for FailingBackend {
    async fn stream_reply(&self, _history: &[HistoryEntry]) -> Result<ModelStream, ModelError> {
        Ok(Box::pin(stream::iter(vec![
            Ok("Par".to_string()),
            Err(ModelError::Backend("model crashed".to_string())),
        ])))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Backend whose reply contains a chunk that looks like the done sentinel.
struct SentinelBackend;

#[async_trait]
impl ModelBackend for SentinelBackend {
    async fn stream_reply(&self, _history: &[HistoryEntry]) -> Result<ModelStream, ModelError> {
        Ok(Box::pin(stream::iter(vec![
            Ok("A".to_string()),
            Ok("[DONE]".to_string()),
            Ok("B".to_string()),
        ])))
    }

    fn name(&self) -> &'static str {
        "sentinel"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn full_exchange_builds_reply() {
    let url = spawn_server(EchoBackend::new(), Arc::new(MemoryHistory::new())).await;
    let mut client = connect(&url).await;
    let mut reducer = StreamReducer::new();
    let session = SessionId::from(1);

    reducer.user_message("hello there");
    send_user_message(&mut client, "hello there", &session).await;
    let kinds = read_turn(&mut client, &mut reducer).await;

    assert_eq!(kinds.first().map(String::as_str), Some("ack"));
    assert_eq!(kinds.get(1).map(String::as_str), Some("route_decision"));
    assert!(kinds[2..].iter().all(|k| k == "final_response"));

    let turn = reducer.transcript().last().unwrap();
    assert_eq!(turn.status, TurnStatus::Complete);
    assert_eq!(turn.user_text.as_deref(), Some("hello there"));
    assert_eq!(
        turn.reply_text,
        "[ACK] Uhhhh, let's have a look... [/ACK]\
         [ROUTER] Let's see what TARS has to say... [/ROUTER]\n\nhello there"
    );
}

#[tokio::test]
async fn history_records_both_sides() {
    let history = Arc::new(MemoryHistory::new());
    let url = spawn_server(EchoBackend::new(), Arc::clone(&history)).await;
    let mut client = connect(&url).await;
    let mut reducer = StreamReducer::new();
    let session = SessionId::from(7);

    for message in ["first", "second"] {
        reducer.user_message(message);
        send_user_message(&mut client, message, &session).await;
        read_turn(&mut client, &mut reducer).await;
    }

    let entries = history.history(&session).unwrap();
    let roles: Vec<Role> = entries.iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(entries[3].content, "second");
    assert_eq!(reducer.transcript().len(), 2);
}

#[tokio::test]
async fn session_id_accepts_integer() {
    let history = Arc::new(MemoryHistory::new());
    let url = spawn_server(EchoBackend::new(), Arc::clone(&history)).await;
    let mut client = connect(&url).await;
    let mut reducer = StreamReducer::new();

    reducer.user_message("hi");
    send_text(
        &mut client,
        r#"{"type":"user_message","message":"hi","sessionId":1}"#.to_string(),
    )
    .await;
    read_turn(&mut client, &mut reducer).await;

    assert_eq!(history.history(&SessionId::from(1)).unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_request_gets_error_and_connection_survives() {
    let url = spawn_server(EchoBackend::new(), Arc::new(MemoryHistory::new())).await;
    let mut client = connect(&url).await;

    send_text(&mut client, "not json".to_string()).await;
    let event = classify(&next_text(&mut client).await).unwrap();
    assert_eq!(event.kind, EventKind::Error);
    assert!(event.payload.starts_with("invalid request:"));

    let mut reducer = StreamReducer::new();
    reducer.user_message("still here");
    send_user_message(&mut client, "still here", &SessionId::from(2)).await;
    read_turn(&mut client, &mut reducer).await;
    assert_eq!(
        reducer.transcript().last().unwrap().status,
        TurnStatus::Complete
    );
}

#[tokio::test]
async fn model_failure_sends_error_without_done() {
    let history = Arc::new(MemoryHistory::new());
    let url = spawn_server(FailingBackend, Arc::clone(&history)).await;
    let mut client = connect(&url).await;
    let mut reducer = StreamReducer::new();
    let session = SessionId::from(3);

    reducer.user_message("capital of France?");
    send_user_message(&mut client, "capital of France?", &session).await;

    let kinds = [
        next_text(&mut client).await,
        next_text(&mut client).await,
        next_text(&mut client).await,
        next_text(&mut client).await,
    ]
    .iter()
    .map(|text| {
        reducer.apply_raw(text);
        classify(text).unwrap().kind.as_str().to_string()
    })
    .collect::<Vec<_>>();

    assert_eq!(kinds, vec!["ack", "route_decision", "final_response", "error"]);

    let turns = reducer.transcript().snapshot();
    assert_eq!(turns.len(), 2);
    assert!(turns[0].reply_text.ends_with("Par"));
    assert_eq!(turns[1].status, TurnStatus::Failed);
    assert_eq!(turns[1].reply_text, "⚠️ ERROR: model error: model crashed\n");

    // Only the user side is recorded when the reply fails.
    assert_eq!(history.history(&session).unwrap().len(), 1);
}

#[tokio::test]
async fn health_endpoint_reports_backend() {
    let url = spawn_server(EchoBackend::new(), Arc::new(MemoryHistory::new())).await;
    let health_url = url
        .replace("ws://", "http://")
        .replace("/ws/agent", "/health");

    let body: serde_json::Value = reqwest::get(&health_url)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "echo");
}

#[tokio::test]
async fn sentinel_chunk_from_model_does_not_end_reply() {
    let history = Arc::new(MemoryHistory::new());
    let url = spawn_server(SentinelBackend, Arc::clone(&history)).await;
    let mut client = connect(&url).await;
    let mut reducer = StreamReducer::new();
    let session = SessionId::from(4);

    reducer.user_message("go");
    send_user_message(&mut client, "go", &session).await;
    let kinds = read_turn(&mut client, &mut reducer).await;

    assert_eq!(kinds.len(), 5);
    let turn = reducer.transcript().last().unwrap();
    assert_eq!(turn.status, TurnStatus::Complete);
    assert!(turn.reply_text.ends_with("AB"));
    assert_eq!(history.history(&session).unwrap()[1].content, "AB");
}
