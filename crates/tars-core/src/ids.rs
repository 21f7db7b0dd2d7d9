//! Session identifier.
//!
//! A [`SessionId`] correlates one client transcript with one server-side
//! conversation history. It is opaque to the client: the connection manager
//! attaches it to every send and nothing else inspects it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier was empty or only whitespace.
    #[error("session id must not be empty")]
    Empty,
}

/// Opaque conversation identifier.
///
/// Serializes as a JSON string. Deserializes from either a string or an
/// unsigned integer, since older clients send numeric ids.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random `SessionId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<u64> for SessionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self::from(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn parse_trims_and_rejects_empty() {
        let id: SessionId = "  abc  ".parse().unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!("   ".parse::<SessionId>(), Err(IdError::Empty));
    }

    #[test]
    fn numeric_ids_deserialize() {
        let id: SessionId = serde_json::from_str("1").unwrap();
        assert_eq!(id, SessionId::from(1));
        assert_eq!(id.to_string(), "1");
    }

    #[test]
    fn string_ids_deserialize() {
        let id: SessionId = serde_json::from_str("\"session-7\"").unwrap();
        assert_eq!(id.as_str(), "session-7");
    }

    #[test]
    fn empty_string_id_is_rejected() {
        assert!(serde_json::from_str::<SessionId>("\"\"").is_err());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&SessionId::from(42)).unwrap();
        assert_eq!(json, "\"42\"");
    }

    #[test]
    fn debug_format() {
        let id = SessionId::from(3);
        assert_eq!(format!("{id:?}"), "SessionId(3)");
    }
}
