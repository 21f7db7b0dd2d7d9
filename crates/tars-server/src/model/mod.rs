//! Model backends that produce streamed replies.
//!
//! A backend receives the whole session history and returns a stream of
//! text chunks. The WebSocket handler forwards each chunk as a
//! `final_response` frame.

mod echo;
mod ollama;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use tars_store::HistoryEntry;

use crate::error::ModelError;

pub use echo::EchoBackend;
pub use ollama::OllamaBackend;

/// Stream of reply chunks. An `Err` item ends the reply.
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<String, ModelError>> + Send>>;

/// Trait for reply generation.
///
/// This trait abstracts the language model, allowing an offline backend in
/// tests.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Start streaming a reply to the last user entry of `history`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a reply. Failures after
    /// streaming began arrive as `Err` items.
    async fn stream_reply(&self, history: &[HistoryEntry]) -> Result<ModelStream, ModelError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
