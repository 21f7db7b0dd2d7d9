//! WebSocket model-serving backend for the TARS chat client.
//!
//! This crate serves the streaming chat protocol consumed by `tars-cli`.
//! It handles:
//!
//! - The `/ws/agent` WebSocket, one ordered event sequence per user message
//! - Per-session conversation history through [`tars_store::SessionHistory`]
//! - Reply generation through a pluggable [`ModelBackend`]
//! - A `/health` endpoint
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  user_message   ┌─────────────────────────────┐
//! │   tars-cli   │ ──────────────► │         tars-server         │
//! │  (reducer)   │ ◄────────────── │  ws handler ─► ModelBackend │
//! └──────────────┘  ack / route /  │      │                      │
//!                   final / error  │      ▼                      │
//!                                  │  SessionHistory             │
//!                                  └─────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tars_server::{create_router, EchoBackend, ServerConfig, ServerState};
//! use tars_store::MemoryHistory;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let history = Arc::new(MemoryHistory::with_limit(config.history_limit));
//! let state = ServerState::new(Arc::new(EchoBackend::new()), history, config);
//!
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod state;

pub use config::{BackendKind, ModelConfig, ServerConfig};
pub use error::{ModelError, Result, ServerError};
pub use model::{EchoBackend, ModelBackend, ModelStream, OllamaBackend};
pub use routes::create_router;
pub use state::ServerState;
