//! Wire frames exchanged over the streaming connection.
//!
//! Endpoint: WS /ws/agent
//!
//! Server frames are flat `{"type": .., "message": ..}` objects. The client
//! side never deserializes them into [`ServerFrame`] directly; inbound text
//! goes through [`crate::classify`] so unknown tags survive.

use serde::{Deserialize, Serialize};

use crate::event::{EventKind, DONE_SENTINEL};
use crate::ids::SessionId;

/// Client -> Server: messages sent to the model-serving backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// A user message for the conversation identified by `session_id`.
    UserMessage {
        /// The user's input text.
        message: String,
        /// Conversation the message belongs to.
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
}

impl ClientFrame {
    /// Build a user message frame.
    #[must_use]
    pub fn user_message(message: impl Into<String>, session_id: SessionId) -> Self {
        Self::UserMessage {
            message: message.into(),
            session_id,
        }
    }
}

/// Server -> Client: one typed streaming event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFrame {
    /// Event tag (`ack`, `route_decision`, `final_response`, `error`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Event payload.
    pub message: String,
}

impl ServerFrame {
    /// Build a frame for an arbitrary event kind.
    #[must_use]
    pub fn new(kind: &EventKind, message: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            message: message.into(),
        }
    }

    /// Immediate acknowledgement snapshot.
    #[must_use]
    pub fn ack(message: impl Into<String>) -> Self {
        Self::new(&EventKind::Ack, message)
    }

    /// Routing decision fragment.
    #[must_use]
    pub fn route_decision(message: impl Into<String>) -> Self {
        Self::new(&EventKind::RouteDecision, message)
    }

    /// Final response fragment.
    #[must_use]
    pub fn final_response(message: impl Into<String>) -> Self {
        Self::new(&EventKind::FinalResponse, message)
    }

    /// Terminal success sentinel.
    #[must_use]
    pub fn done() -> Self {
        Self::final_response(DONE_SENTINEL)
    }

    /// Error report.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(&EventKind::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_serializes_with_camel_case_session() {
        let frame = ClientFrame::user_message("hello", SessionId::from(1));
        let parsed: serde_json::Value = serde_json::to_value(&frame).unwrap();

        assert_eq!(parsed["type"], "user_message");
        assert_eq!(parsed["message"], "hello");
        assert_eq!(parsed["sessionId"], "1");
    }

    #[test]
    fn user_message_accepts_numeric_session() {
        let json = r#"{"type":"user_message","message":"hi","sessionId":1}"#;
        let frame: ClientFrame = serde_json::from_str(json).unwrap();

        let ClientFrame::UserMessage { message, session_id } = frame;
        assert_eq!(message, "hi");
        assert_eq!(session_id, SessionId::from(1));
    }

    #[test]
    fn user_message_requires_session() {
        let json = r#"{"type":"user_message","message":"hi"}"#;
        assert!(serde_json::from_str::<ClientFrame>(json).is_err());
    }

    #[test]
    fn server_frames_use_wire_tags() {
        let cases = [
            (ServerFrame::ack("a"), "ack"),
            (ServerFrame::route_decision("r"), "route_decision"),
            (ServerFrame::final_response("f"), "final_response"),
            (ServerFrame::error("e"), "error"),
        ];
        for (frame, tag) in cases {
            let parsed: serde_json::Value = serde_json::to_value(&frame).unwrap();
            assert_eq!(parsed["type"], tag);
        }
    }

    #[test]
    fn done_frame_carries_sentinel() {
        let json = serde_json::to_string(&ServerFrame::done()).unwrap();
        assert_eq!(json, r#"{"type":"final_response","message":"[DONE]"}"#);
    }
}
