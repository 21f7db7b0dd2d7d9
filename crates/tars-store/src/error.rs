//! Error types for the history store.

use tars_core::SessionId;
use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during history operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No history exists for the session.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// The underlying storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}
