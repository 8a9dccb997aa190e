//! Error types for the protocol crate.
//!
//! Two families live here:
//! - [`ProtocolError`]: a response arrived but did not satisfy the contract
//!   of the operation that requested it.
//! - [`TransportError`]: the request never produced a usable response. Every
//!   transport failure is normalized once into `{kind, http_status, message}`
//!   by [`TransportError::normalize`], so callers match on the status instead
//!   of re-deriving it.

use thiserror::Error;

use crate::payload::PayloadKind;

/// Protocol error type covering responses that violate an operation contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    // Decoding errors
    /// A JSON payload did not match the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The response carried a different payload kind than the operation expects.
    #[error("unexpected payload: expected {expected}, got {got}")]
    UnexpectedPayload {
        /// Payload kind the operation can interpret.
        expected: PayloadKind,
        /// Payload kind actually received.
        got: PayloadKind,
    },

    // Logical failures
    /// Well-formed response that fails the success predicate.
    ///
    /// The message is the backend's own text.
    #[error("{0}")]
    Rejected(String),

    // Request construction
    /// The request URL could not be built from the base URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Deserialization(err.to_string())
    }
}

impl From<url::ParseError> for ProtocolError {
    fn from(err: url::ParseError) -> Self {
        ProtocolError::InvalidUrl(err.to_string())
    }
}

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The request could not be built (bad URL, bad multipart part, ...).
    Request,
    /// Connection refused, reset, DNS failure and the like.
    Network,
    /// The configured request timeout elapsed.
    Timeout,
    /// The server answered with a non-success HTTP status.
    Status,
    /// The response body could not be read.
    Body,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransportErrorKind::Request => "request",
            TransportErrorKind::Network => "network",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Status => "status",
            TransportErrorKind::Body => "body",
        };
        f.write_str(name)
    }
}

/// A transport failure, normalized once at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// HTTP status associated with the failure, when one could be resolved.
    pub http_status: Option<u16>,
    /// Human-readable message, preferring the server's own text.
    pub message: String,
}

/// Raw facts about a failed request, as gathered by a transport implementation.
///
/// Different failure paths expose the HTTP status in different places: on the
/// response itself, nested inside an error body, or only inside a formatted
/// message. [`TransportError::normalize`] folds all of them.
#[derive(Debug, Clone, Default)]
pub struct FailureParts {
    /// Status of the HTTP response, if one was received.
    pub status: Option<u16>,
    /// Response body text, if one was read.
    pub body: Option<String>,
    /// Formatted message of the underlying error.
    pub message: String,
    /// Category reported by the underlying client, if it knows better.
    pub kind_hint: Option<TransportErrorKind>,
}

impl TransportError {
    /// Create a transport error directly.
    pub fn new(kind: TransportErrorKind, http_status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status,
            message: message.into(),
        }
    }

    /// Failure to build the request.
    pub fn request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Request, None, message)
    }

    /// Failure to reach the server.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, None, message)
    }

    /// Non-success HTTP status with the response body as message.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::normalize(FailureParts {
            status: Some(status),
            body: Some(body.into()),
            ..FailureParts::default()
        })
    }

    /// Fold every known failure shape into a single value.
    ///
    /// The HTTP status is resolved from, in order: the response status, a
    /// `status`/`code` number nested in a JSON error body, a three-digit
    /// status token inside the message. The message is the trimmed body
    /// text when the body is non-empty, the underlying message otherwise.
    pub fn normalize(parts: FailureParts) -> Self {
        let body = parts
            .body
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty());

        let http_status = parts
            .status
            .or_else(|| body.and_then(nested_status))
            .or_else(|| status_token(&parts.message));

        let kind = match parts.kind_hint {
            Some(TransportErrorKind::Timeout) => TransportErrorKind::Timeout,
            Some(TransportErrorKind::Request) => TransportErrorKind::Request,
            _ if http_status.is_some() => TransportErrorKind::Status,
            Some(hint) => hint,
            None => TransportErrorKind::Network,
        };

        let message = match body {
            Some(text) => body_message(text),
            None if parts.message.is_empty() => match http_status {
                Some(code) => format!("request failed with status {}", code),
                None => "request failed".to_string(),
            },
            None => parts.message,
        };

        Self {
            kind,
            http_status,
            message,
        }
    }

    /// Whether the failure carries the given HTTP status.
    pub fn has_status(&self, code: u16) -> bool {
        self.http_status == Some(code)
    }
}

/// Pull a status out of a JSON error body such as `{"status": 400}` or
/// `{"response": {"status": 400}}`.
fn nested_status(body: &str) -> Option<u16> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.get("status"),
        value.get("code"),
        value.get("response").and_then(|r| r.get("status")),
    ];
    let status = candidates
        .into_iter()
        .flatten()
        .find_map(|v| match v {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .and_then(|n| u16::try_from(n).ok())
        .filter(|n| (400..600).contains(n));
    status
}

/// Find a standalone three-digit error status in a formatted message.
fn status_token(message: &str) -> Option<u16> {
    message
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 3)
        .filter_map(|token| token.parse::<u16>().ok())
        .find(|code| (400..600).contains(code))
}

/// Prefer a `message`/`error` field of a JSON error body over the raw text.
fn body_message(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .into_iter()
                .find_map(|key| v.get(key).and_then(|m| m.as_str()).map(str::to_owned))
        })
        .unwrap_or_else(|| text.to_string())
}
