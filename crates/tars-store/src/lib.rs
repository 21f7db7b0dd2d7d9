//! Conversation history storage for TARS.
//!
//! The serving backend keeps one ordered history per [`SessionId`] so the
//! model sees earlier turns of the same conversation. The history is reached
//! only through the [`SessionHistory`] trait; callers inject an
//! implementation instead of sharing a global map.
//!
//! # Example
//!
//! ```
//! use tars_store::{HistoryEntry, MemoryHistory, SessionHistory};
//! use tars_core::SessionId;
//!
//! let history = MemoryHistory::new();
//! let session = SessionId::from(1);
//!
//! history.append(&session, HistoryEntry::user("hi")).unwrap();
//! history.append(&session, HistoryEntry::assistant("hello")).unwrap();
//!
//! assert_eq!(history.history(&session).unwrap().len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod types;

pub use error::{Result, StoreError};
pub use memory::MemoryHistory;
pub use types::{HistoryEntry, Role};

use tars_core::SessionId;

/// Storage for per-session conversation histories.
///
/// Implementations must keep entries of one session in insertion order.
pub trait SessionHistory: Send + Sync {
    /// Append an entry to a session, creating the session if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    fn append(&self, session_id: &SessionId, entry: HistoryEntry) -> Result<()>;

    /// All entries of a session, oldest first. Unknown sessions are empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    fn history(&self, session_id: &SessionId) -> Result<Vec<HistoryEntry>>;

    /// Forget a session.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the session has no history.
    fn clear(&self, session_id: &SessionId) -> Result<()>;

    /// Number of sessions with at least one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    fn session_count(&self) -> Result<usize>;
}
