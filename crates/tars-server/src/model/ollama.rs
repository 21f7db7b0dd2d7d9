//! Ollama chat backend.
//!
//! Calls `POST {base_url}/api/chat` with `stream: true`. Ollama answers with
//! newline-delimited JSON objects, each carrying a `message.content` piece,
//! and a final object with `done: true`.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use tars_store::HistoryEntry;

use super::{ModelBackend, ModelStream};
use crate::config::ModelConfig;
use crate::error::ModelError;

/// HTTP client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a backend from model settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self::with_client(client, &config.base_url, &config.model))
    }

    /// Create a backend with a custom reqwest client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Get the base URL of the Ollama server.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for `/api/chat`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// One line of the streamed response.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Splits a byte stream into NDJSON lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Add bytes and return every line completed by them.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }
        lines
    }

    /// Whatever is left once the body ends.
    fn finish(self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

/// Decode one line into its content piece and the done flag.
fn decode_line(line: &str) -> Result<(String, bool), ModelError> {
    let chunk: ChatChunk =
        serde_json::from_str(line).map_err(|e| ModelError::Decode(format!("{e}: {line}")))?;

    if let Some(error) = chunk.error {
        return Err(ModelError::Backend(error));
    }

    let content = chunk.message.map(|m| m.content).unwrap_or_default();
    Ok((content, chunk.done))
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn stream_reply(&self, history: &[HistoryEntry]) -> Result<ModelStream, ModelError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: history
                .iter()
                .map(|entry| ChatMessage {
                    role: entry.role.as_str(),
                    content: &entry.content,
                })
                .collect(),
            stream: true,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Ollama rejected chat request");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(model = %self.model, messages = history.len(), "Ollama stream started");

        let stream = async_stream::stream! {
            let mut body = response.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(bytes) = body.next().await {
                let bytes = match bytes {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(ModelError::Request(e.to_string()));
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    match decode_line(&line) {
                        Ok((content, done)) => {
                            if !content.is_empty() {
                                yield Ok(content);
                            }
                            if done {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            if let Some(line) = lines.finish() {
                match decode_line(&line) {
                    Ok((content, _)) if !content.is_empty() => {
                        yield Ok(content);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(e);
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
