//! Server and model-backend error types.

use thiserror::Error;

use tars_store::StoreError;

/// A result type using `ServerError`.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors raised while configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Binding or serving failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The history store failed.
    #[error("history error: {0}")]
    Store(#[from] StoreError),

    /// The model backend failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Errors raised by a model backend while producing a reply.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request could not be sent or the body could not be read.
    #[error("model request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("model returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A streamed line was not valid backend output.
    #[error("invalid model output: {0}")]
    Decode(String),

    /// The backend reported an error of its own.
    #[error("model error: {0}")]
    Backend(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message() {
        let err = ModelError::Status {
            status: 404,
            body: "model not found".into(),
        };
        assert_eq!(err.to_string(), "model returned status 404: model not found");
    }

    #[test]
    fn model_error_is_transparent_in_server_error() {
        let err = ServerError::from(ModelError::Backend("out of memory".into()));
        assert_eq!(err.to_string(), "model error: out of memory");
    }
}
