//! Offline backend that repeats the user.

use async_trait::async_trait;
use futures::stream;

use tars_store::{HistoryEntry, Role};

use super::{ModelBackend, ModelStream};
use crate::error::ModelError;

/// Streams the most recent user message back word by word.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoBackend;

impl EchoBackend {
    /// Create an echo backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelBackend for EchoBackend {
    async fn stream_reply(&self, history: &[HistoryEntry]) -> Result<ModelStream, ModelError> {
        let last = history
            .iter()
            .rev()
            .find(|entry| entry.role == Role::User)
            .ok_or_else(|| ModelError::Backend("no user message to answer".to_string()))?;

        let words: Vec<Result<String, ModelError>> = last
            .content
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();

        Ok(Box::pin(stream::iter(words)))
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}
