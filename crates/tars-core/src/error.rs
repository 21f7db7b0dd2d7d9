//! Common error types for TARS.
//!
//! This module provides the error taxonomy shared by the reducer, the
//! connection manager and the serving backend.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while classifying, reducing or transporting events.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An inbound frame could not be parsed into an event.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The transcript was mutated before any turn existed.
    #[error("transcript is empty")]
    EmptyTranscript,

    /// The connection to the backend failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The model-serving backend reported a failure through an `error` frame.
    #[error("model error: {0}")]
    Model(String),
}

impl CoreError {
    /// Text shown to the user when this error surfaces as an error turn.
    ///
    /// Transport and model failures carry their message verbatim; the other
    /// variants fall back to the `Display` form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) | Self::Model(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
