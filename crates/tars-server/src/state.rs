//! Server application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use tars_store::SessionHistory;

use crate::config::ServerConfig;
use crate::model::ModelBackend;

/// Shared application state for the server.
///
/// Holds the model backend, the session history store and configuration.
pub struct ServerState<M, H>
where
    M: ModelBackend,
    H: SessionHistory,
{
    /// Backend that produces replies.
    pub model: Arc<M>,
    /// Per-session conversation history.
    pub history: Arc<H>,
    /// Server configuration.
    pub config: ServerConfig,
}

impl<M, H> ServerState<M, H>
where
    M: ModelBackend,
    H: SessionHistory,
{
    /// Create a new server state.
    #[must_use]
    pub fn new(model: Arc<M>, history: Arc<H>, config: ServerConfig) -> Self {
        Self {
            model,
            history,
            config,
        }
    }
}

impl<M, H> Clone for ServerState<M, H>
where
    M: ModelBackend,
    H: SessionHistory,
{
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            history: Arc::clone(&self.history),
            config: self.config.clone(),
        }
    }
}
