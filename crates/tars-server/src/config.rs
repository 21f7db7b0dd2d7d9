//! Server configuration types.
//!
//! Values come from `Default`, optionally overlaid by `TARS_*` environment
//! variables through [`ServerConfig::from_env`].

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ServerError};

/// Configuration for the serving backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8000").
    #[serde(default = "ServerConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins. `*` allows any origin.
    #[serde(default = "ServerConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// WebSocket idle timeout in seconds.
    #[serde(default = "ServerConfig::default_ws_timeout")]
    pub websocket_timeout_seconds: u64,

    /// Pause after the ack and route frames, in milliseconds.
    #[serde(default = "ServerConfig::default_phase_delay")]
    pub phase_delay_ms: u64,

    /// Text of the immediate acknowledgement frame.
    #[serde(default = "ServerConfig::default_ack_message")]
    pub ack_message: String,

    /// Text of the routing frame.
    #[serde(default = "ServerConfig::default_route_message")]
    pub route_message: String,

    /// Entries kept per session history. Zero keeps everything.
    #[serde(default = "ServerConfig::default_history_limit")]
    pub history_limit: usize,

    /// Model backend settings.
    #[serde(default)]
    pub model: ModelConfig,
}

impl ServerConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8000".to_string()
    }

    fn default_cors_origins() -> Vec<String> {
        vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ]
    }

    const fn default_ws_timeout() -> u64 {
        300 // 5 minutes
    }

    const fn default_phase_delay() -> u64 {
        1000
    }

    fn default_ack_message() -> String {
        "Uhhhh, let's have a look...".to_string()
    }

    fn default_route_message() -> String {
        "Let's see what TARS has to say...".to_string()
    }

    const fn default_history_limit() -> usize {
        50
    }

    /// Defaults overlaid with `TARS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if a numeric or enum variable does not
    /// parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if a numeric or enum value does not
    /// parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("TARS_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(origins) = lookup("TARS_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(delay) = lookup("TARS_PHASE_DELAY_MS") {
            config.phase_delay_ms = parse_var("TARS_PHASE_DELAY_MS", &delay)?;
        }
        if let Some(limit) = lookup("TARS_HISTORY_LIMIT") {
            config.history_limit = parse_var("TARS_HISTORY_LIMIT", &limit)?;
        }
        if let Some(backend) = lookup("TARS_MODEL_BACKEND") {
            config.model.backend = parse_var("TARS_MODEL_BACKEND", &backend)?;
        }
        if let Some(url) = lookup("TARS_MODEL_URL") {
            config.model.base_url = url;
        }
        if let Some(model) = lookup("TARS_MODEL") {
            config.model.model = model;
        }

        Ok(config)
    }

    /// Get the WebSocket idle timeout as a `Duration`.
    #[must_use]
    pub fn websocket_timeout(&self) -> Duration {
        Duration::from_secs(self.websocket_timeout_seconds)
    }

    /// Get the phase delay as a `Duration`.
    #[must_use]
    pub fn phase_delay(&self) -> Duration {
        Duration::from_millis(self.phase_delay_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: Self::default_cors_origins(),
            websocket_timeout_seconds: Self::default_ws_timeout(),
            phase_delay_ms: Self::default_phase_delay(),
            ack_message: Self::default_ack_message(),
            route_message: Self::default_route_message(),
            history_limit: Self::default_history_limit(),
            model: ModelConfig::default(),
        }
    }
}

/// Which model backend serves replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A local Ollama server.
    #[default]
    Ollama,
    /// Offline echo of the user's message.
    Echo,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "echo" => Ok(Self::Echo),
            other => Err(format!("unknown model backend: {other}")),
        }
    }
}

/// Model backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: BackendKind,

    /// Base URL of the Ollama server.
    #[serde(default = "ModelConfig::default_base_url")]
    pub base_url: String,

    /// Model name passed to the backend.
    #[serde(default = "ModelConfig::default_model")]
    pub model: String,

    /// Whole-request timeout in seconds.
    #[serde(default = "ModelConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ModelConfig {
    fn default_base_url() -> String {
        "http://localhost:11434".to_string()
    }

    fn default_model() -> String {
        "gemma3:4b".to_string()
    }

    const fn default_request_timeout() -> u64 {
        120
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ServerError::Config(format!("{key}={value}: {e}")))
}
