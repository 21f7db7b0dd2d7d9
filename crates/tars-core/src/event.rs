//! Typed streaming events and the classifier that produces them.

use serde_json::Value;

use crate::error::{CoreError, Result};

/// Payload value that signals the end of a reply stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Kind of a server event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Full-state acknowledgement snapshot.
    Ack,
    /// Routing decision fragment.
    RouteDecision,
    /// Final response fragment (or the `[DONE]` sentinel).
    FinalResponse,
    /// Error reported by the backend.
    Error,
    /// Any tag outside the recognized set, preserved verbatim.
    Other(String),
}

impl EventKind {
    /// Map a wire tag to its kind. Unrecognized tags become [`EventKind::Other`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ack" => Self::Ack,
            "route_decision" => Self::RouteDecision,
            "final_response" => Self::FinalResponse,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire tag for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ack => "ack",
            Self::RouteDecision => "route_decision",
            Self::FinalResponse => "final_response",
            Self::Error => "error",
            Self::Other(tag) => tag,
        }
    }

    /// Whether this kind carries an incremental reply fragment.
    #[must_use]
    pub const fn is_fragment(&self) -> bool {
        matches!(self, Self::RouteDecision | Self::FinalResponse)
    }
}

/// A classified server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event kind.
    pub kind: EventKind,
    /// Raw payload text.
    pub payload: String,
}

impl Event {
    /// Create an event.
    #[must_use]
    pub fn new(kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Whether this event is the `[DONE]` sentinel on a fragment-carrying kind.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.kind.is_fragment() && self.payload == DONE_SENTINEL
    }
}

/// Classify one raw inbound text frame.
///
/// # Errors
///
/// Returns [`CoreError::MalformedEvent`] if the text is not JSON or fails
/// [`classify_value`].
pub fn classify(raw: &str) -> Result<Event> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CoreError::MalformedEvent(format!("invalid JSON: {e}")))?;
    classify_value(&value)
}

/// Classify an already-parsed frame.
///
/// The frame must be an object with a string `type` and a string `message`.
/// Tags outside the recognized set are kept as [`EventKind::Other`].
///
/// # Errors
///
/// Returns [`CoreError::MalformedEvent`] if the frame is not an object, if
/// `type` is missing or not a string, or if `message` is missing or not a string.
pub fn classify_value(value: &Value) -> Result<Event> {
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::MalformedEvent("frame is not an object".to_string()))?;

    let tag = match obj.get("type") {
        Some(Value::String(tag)) => tag,
        Some(_) => return Err(CoreError::MalformedEvent("`type` is not a string".to_string())),
        None => return Err(CoreError::MalformedEvent("missing `type`".to_string())),
    };

    let payload = match obj.get("message") {
        Some(Value::String(message)) => message.clone(),
        Some(_) => {
            return Err(CoreError::MalformedEvent(
                "`message` is not a string".to_string(),
            ))
        }
        None => return Err(CoreError::MalformedEvent("missing `message`".to_string())),
    };

    Ok(Event::new(EventKind::from_tag(tag), payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =========================================================================
    // EventKind
    // =========================================================================

    #[test]
    fn recognized_tags_round_trip() {
        for tag in ["ack", "route_decision", "final_response", "error"] {
            let kind = EventKind::from_tag(tag);
            assert!(!matches!(kind, EventKind::Other(_)), "{tag} should be recognized");
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let kind = EventKind::from_tag("tool_progress");
        assert_eq!(kind, EventKind::Other("tool_progress".to_string()));
        assert_eq!(kind.as_str(), "tool_progress");
    }

    #[test]
    fn tags_are_case_sensitive() {
        assert_eq!(EventKind::from_tag("ACK"), EventKind::Other("ACK".to_string()));
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn classify_ack() {
        let event = classify(r#"{"type":"ack","message":"thinking"}"#).unwrap();
        assert_eq!(event, Event::new(EventKind::Ack, "thinking"));
    }

    #[test]
    fn classify_keeps_unknown_kind() {
        let event = classify(r#"{"type":"heartbeat","message":""}"#).unwrap();
        assert_eq!(event.kind, EventKind::Other("heartbeat".to_string()));
        assert_eq!(event.payload, "");
    }

    #[test]
    fn classify_ignores_extra_fields() {
        let event =
            classify(r#"{"type":"final_response","message":"Paris","request_id":"r1"}"#).unwrap();
        assert_eq!(event, Event::new(EventKind::FinalResponse, "Paris"));
    }

    #[test]
    fn classify_rejects_invalid_json() {
        let err = classify("not json").unwrap_err();
        assert!(matches!(err, CoreError::MalformedEvent(_)));
    }

    #[test]
    fn classify_rejects_non_object() {
        let err = classify_value(&json!(["ack", "x"])).unwrap_err();
        assert!(matches!(err, CoreError::MalformedEvent(_)));
    }

    #[test]
    fn classify_rejects_missing_type() {
        let err = classify_value(&json!({"message": "x"})).unwrap_err();
        assert_eq!(err.to_string(), "malformed event: missing `type`");
    }

    #[test]
    fn classify_rejects_non_string_type() {
        let err = classify_value(&json!({"type": 3, "message": "x"})).unwrap_err();
        assert!(matches!(err, CoreError::MalformedEvent(_)));
    }

    #[test]
    fn classify_rejects_non_string_message() {
        let err = classify_value(&json!({"type": "ack", "message": {"text": "x"}})).unwrap_err();
        assert_eq!(err.to_string(), "malformed event: `message` is not a string");
    }

    #[test]
    fn classify_rejects_missing_message() {
        let err = classify_value(&json!({"type": "ack"})).unwrap_err();
        assert!(matches!(err, CoreError::MalformedEvent(_)));
    }

    // =========================================================================
    // Sentinel
    // =========================================================================

    #[test]
    fn done_sentinel_on_fragment_kinds() {
        assert!(Event::new(EventKind::FinalResponse, DONE_SENTINEL).is_done());
        assert!(Event::new(EventKind::RouteDecision, DONE_SENTINEL).is_done());
    }

    #[test]
    fn done_sentinel_ignored_on_other_kinds() {
        assert!(!Event::new(EventKind::Ack, DONE_SENTINEL).is_done());
        assert!(!Event::new(EventKind::Error, DONE_SENTINEL).is_done());
        assert!(!Event::new(EventKind::FinalResponse, "[DONE] ").is_done());
    }
}
