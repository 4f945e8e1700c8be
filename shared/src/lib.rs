// shared/src/lib.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised by the in-memory store and its HTTP surface.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0} not found")]
    RecordNotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result of a single outbound call, as seen by the fetch layer.
pub type FetchResult<T> = std::result::Result<T, Failure>;

/// Classification of a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unauthorized,
    NotFound,
    Validation,
    TransientNetwork,
    Unknown,
}

impl FailureKind {
    /// Maps a non-success status to a kind. `structured` tells whether the
    /// response body parsed as JSON.
    pub fn from_status(status: u16, structured: bool) -> Self {
        match status {
            401 => FailureKind::Unauthorized,
            404 => FailureKind::NotFound,
            400..=499 if structured => FailureKind::Validation,
            500..=599 => FailureKind::TransientNetwork,
            _ => FailureKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::NotFound => "not_found",
            FailureKind::Validation => "validation",
            FailureKind::TransientNetwork => "transient_network",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a failed response: parsed JSON when possible, raw text otherwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    /// Parses `body` as JSON, falling back to (lossy) text.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        match serde_json::from_slice(body) {
            Ok(value) => Some(Payload::Json(value)),
            Err(_) => Some(Payload::Text(String::from_utf8_lossy(body).into_owned())),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Json(_))
    }

    /// The human readable message carried by the payload, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Payload::Json(value) => value.get("message").and_then(|m| m.as_str()),
            Payload::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
            Payload::Text(_) => None,
        }
    }
}

/// A classified failure of one attempt.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[error("{kind}{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct Failure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
    pub payload: Option<Payload>,
    /// Repeating the same request cannot change the outcome.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub permanent: bool,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            payload: None,
            permanent: false,
        }
    }

    /// Builds the failure for a non-success response.
    pub fn from_response(status: u16, reason: &str, body: &[u8]) -> Self {
        let payload = Payload::from_body(body);
        let structured = payload.as_ref().is_some_and(Payload::is_structured);
        let message = payload
            .as_ref()
            .and_then(Payload::message)
            .unwrap_or(reason)
            .to_string();

        Self {
            kind: FailureKind::from_status(status, structured),
            status: Some(status),
            message,
            payload,
            permanent: false,
        }
    }

    /// Connectivity problems, timeouts and broken bodies.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TransientNetwork, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unknown, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Marks a failure that no retry can fix, e.g. a request that cannot be built.
    pub fn into_permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == FailureKind::Unauthorized
    }
}

pub mod config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(FailureKind::from_status(401, true), FailureKind::Unauthorized);
        assert_eq!(FailureKind::from_status(401, false), FailureKind::Unauthorized);
        assert_eq!(FailureKind::from_status(404, false), FailureKind::NotFound);
        assert_eq!(FailureKind::from_status(400, true), FailureKind::Validation);
        assert_eq!(FailureKind::from_status(422, true), FailureKind::Validation);
        assert_eq!(FailureKind::from_status(400, false), FailureKind::Unknown);
        assert_eq!(FailureKind::from_status(503, false), FailureKind::TransientNetwork);
        assert_eq!(FailureKind::from_status(302, false), FailureKind::Unknown);
    }

    #[test]
    fn test_failure_from_json_body() {
        let failure = Failure::from_response(
            400,
            "Bad Request",
            br#"{"message":"Progress must be a number between 0 and 100"}"#,
        );
        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.status, Some(400));
        assert_eq!(failure.message, "Progress must be a number between 0 and 100");
        assert!(matches!(failure.payload, Some(Payload::Json(_))));
    }

    #[test]
    fn test_failure_falls_back_to_text() {
        let failure = Failure::from_response(502, "Bad Gateway", b"upstream exploded");
        assert_eq!(failure.kind, FailureKind::TransientNetwork);
        assert_eq!(failure.message, "upstream exploded");
        assert_eq!(
            failure.payload,
            Some(Payload::Text("upstream exploded".to_string()))
        );
    }

    #[test]
    fn test_failure_empty_body_uses_reason() {
        let failure = Failure::from_response(401, "Unauthorized", b"");
        assert!(failure.is_unauthorized());
        assert_eq!(failure.message, "Unauthorized");
        assert!(failure.payload.is_none());
    }

    #[test]
    fn test_display() {
        let failure = Failure::from_response(404, "Not Found", br#"{"message":"User not found"}"#);
        assert_eq!(failure.to_string(), "not_found (404): User not found");
        assert_eq!(
            Failure::transient("connection refused").to_string(),
            "transient_network: connection refused"
        );
    }
}
