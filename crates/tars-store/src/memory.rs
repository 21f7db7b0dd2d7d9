//! In-memory history store.

use std::collections::HashMap;

use parking_lot::RwLock;
use tars_core::SessionId;

use crate::error::{Result, StoreError};
use crate::types::HistoryEntry;
use crate::SessionHistory;

/// Process-local [`SessionHistory`] backed by a locked map.
///
/// With a limit set, each session keeps only its newest `limit` entries.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    sessions: RwLock<HashMap<SessionId, Vec<HistoryEntry>>>,
    limit: Option<usize>,
}

impl MemoryHistory {
    /// Create an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that keeps at most `limit` entries per session.
    ///
    /// A limit of zero is treated as unbounded.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limit: (limit > 0).then_some(limit),
        }
    }
}

impl SessionHistory for MemoryHistory {
    fn append(&self, session_id: &SessionId, entry: HistoryEntry) -> Result<()> {
        let mut sessions = self.sessions.write();
        let entries = sessions.entry(session_id.clone()).or_default();
        entries.push(entry);

        if let Some(limit) = self.limit {
            if entries.len() > limit {
                let excess = entries.len() - limit;
                entries.drain(..excess);
                tracing::debug!(session_id = %session_id, dropped = excess, "history trimmed");
            }
        }
        Ok(())
    }

    fn history(&self, session_id: &SessionId) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    fn clear(&self, session_id: &SessionId) -> Result<()> {
        self.sessions
            .write()
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(session_id.clone()))
    }

    fn session_count(&self) -> Result<usize> {
        Ok(self.sessions.read().len())
    }
}
