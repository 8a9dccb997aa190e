//! Tagged response payloads.
//!
//! The file-manager backend answers with three unrelated shapes: JSON objects
//! (listing, upload), a bare `"OK"` sentinel string (every other mutation) and
//! raw bytes (download). The transport classifies each response once into a
//! [`Payload`]; operations then ask for the variant they understand and get
//! an explicit [`ProtocolError::UnexpectedPayload`] for anything else.

use bytes::Bytes;

use crate::entry::{FileEntry, ListingResponse};
use crate::error::{ProtocolError, Result};

/// Plain-text success marker for mutating operations.
pub const OK_SENTINEL: &str = "OK";

/// Value of the `status` field of a successful upload response.
pub const UPLOAD_SUCCESS: &str = "success";

/// A classified response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured JSON document.
    Json(serde_json::Value),
    /// Text body that is not JSON.
    PlainText(String),
    /// Opaque binary content.
    Binary(Bytes),
}

/// Discriminant of a [`Payload`], used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Json,
    PlainText,
    Binary,
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PayloadKind::Json => "json",
            PayloadKind::PlainText => "plain text",
            PayloadKind::Binary => "binary",
        };
        f.write_str(name)
    }
}

impl Payload {
    /// Classify a response body by its `Content-Type`.
    ///
    /// - `application/json` and `*+json`: parsed as JSON, falling back to text
    ///   when the body does not parse.
    /// - `text/*` or no content type: JSON when the body is a JSON object or
    ///   array (some backends mislabel JSON as `text/html`), text otherwise.
    /// - anything else: binary.
    pub fn classify(content_type: Option<&str>, body: Bytes) -> Self {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty());

        match essence.as_deref() {
            Some(ct) if ct == "application/json" || ct.ends_with("+json") => {
                match serde_json::from_slice(&body) {
                    Ok(value) => Payload::Json(value),
                    Err(_) => Payload::PlainText(String::from_utf8_lossy(&body).into_owned()),
                }
            }
            Some(ct) if ct.starts_with("text/") => Self::sniff_text(body),
            None => Self::sniff_text(body),
            Some(_) => Payload::Binary(body),
        }
    }

    fn sniff_text(body: Bytes) -> Self {
        let text = match std::str::from_utf8(&body) {
            Ok(text) => text,
            Err(_) => return Payload::Binary(body),
        };
        let trimmed = text.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str(trimmed) {
                return Payload::Json(value);
            }
        }
        Payload::PlainText(text.to_string())
    }

    /// Discriminant of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Json(_) => PayloadKind::Json,
            Payload::PlainText(_) => PayloadKind::PlainText,
            Payload::Binary(_) => PayloadKind::Binary,
        }
    }

    /// Interpret the payload as a directory listing (`{ "items": [...] }`).
    pub fn into_listing(self) -> Result<Vec<FileEntry>> {
        match self {
            Payload::Json(value) => {
                let listing: ListingResponse = serde_json::from_value(value)?;
                Ok(listing.items)
            }
            other => Err(ProtocolError::UnexpectedPayload {
                expected: PayloadKind::Json,
                got: other.kind(),
            }),
        }
    }

    /// Interpret the payload as an upload result.
    ///
    /// Only an object whose `status` equals `"success"` counts as success;
    /// every other shape is rejected with the most descriptive text available.
    pub fn into_upload_status(self) -> Result<()> {
        match self {
            Payload::Json(value) => {
                if value.get("status").and_then(|s| s.as_str()) == Some(UPLOAD_SUCCESS) {
                    return Ok(());
                }
                Err(ProtocolError::Rejected(json_failure_text(&value)))
            }
            Payload::PlainText(text) => Err(ProtocolError::Rejected(text.trim().to_string())),
            Payload::Binary(_) => Err(ProtocolError::UnexpectedPayload {
                expected: PayloadKind::Json,
                got: PayloadKind::Binary,
            }),
        }
    }

    /// Interpret the payload as the plain-text `"OK"` sentinel.
    ///
    /// Any other text is a rejection carrying that text. A JSON string
    /// literal is accepted as text.
    pub fn into_ok_sentinel(self) -> Result<()> {
        let text = match self {
            Payload::PlainText(text) => text,
            Payload::Json(serde_json::Value::String(text)) => text,
            other => {
                return Err(ProtocolError::UnexpectedPayload {
                    expected: PayloadKind::PlainText,
                    got: other.kind(),
                })
            }
        };
        let text = text.trim();
        if text == OK_SENTINEL {
            Ok(())
        } else {
            Err(ProtocolError::Rejected(text.to_string()))
        }
    }
}

/// Best message for a JSON upload failure: `message`, then `error`, then a
/// non-success `status`, then the document itself.
fn json_failure_text(value: &serde_json::Value) -> String {
    ["message", "error", "status"]
        .into_iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_owned)
        .unwrap_or_else(|| value.to_string())
}
