//! The stream event envelope.
//!
//! Every frame on a workspace stream carries one JSON object:
//!
//! ```json
//! {"type": "document", "payload": "# Lecture 1 ...", "timestamp": "2025-08-04T10:00:00Z"}
//! ```
//!
//! `type` drives dispatch. Kinds this client does not know about still decode
//! (as [`EventKind::Unknown`]) so that newer servers can add event kinds
//! without breaking older clients.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::EnumString;

/// Dispatch key of a [`StreamEvent`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Full replacement of the document text.
    #[strum(serialize = "document")]
    Document,
    /// One structured log record, appended.
    #[strum(serialize = "log")]
    Log,
    /// Wholesale replacement of the citation list.
    #[strum(serialize = "source")]
    Source,
    /// Run status token.
    #[strum(serialize = "status")]
    Status,
    /// Export status token.
    #[strum(serialize = "export")]
    Export,
    /// Anything else. Carried verbatim, never an error.
    #[strum(default)]
    Unknown(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Document => "document",
            EventKind::Log => "log",
            EventKind::Source => "source",
            EventKind::Status => "status",
            EventKind::Export => "export",
            EventKind::Unknown(s) => s,
        }
    }

    /// Whether this client knows how to apply the kind.
    pub fn is_known(&self) -> bool {
        !matches!(self, EventKind::Unknown(_))
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        // EnumString with a default variant is infallible.
        s.parse().unwrap_or(EventKind::Unknown(s))
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> String {
        match kind {
            EventKind::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to decode a frame into a [`StreamEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("malformed event JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One typed, timestamped unit of inbound workspace data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type", alias = "kind")]
    pub kind: EventKind,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub timestamp: String,
}

impl StreamEvent {
    /// Build an event; `kind` accepts a wire name or an [`EventKind`].
    pub fn new(kind: impl Into<String>, payload: Value, timestamp: impl Into<String>) -> Self {
        Self {
            kind: EventKind::from(kind.into()),
            payload,
            timestamp: timestamp.into(),
        }
    }

    /// Decode one frame's data.
    pub fn from_json(data: &str) -> Result<Self, EventDecodeError> {
        Ok(serde_json::from_str(data)?)
    }

    /// The payload read as a full document text.
    ///
    /// Strings are taken as-is, `null` is the empty document, and any other
    /// value is rendered as compact JSON.
    pub fn document_text(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// The payload read as a citation list. Non-array payloads clear the list.
    pub fn source_list(&self) -> Vec<Value> {
        match &self.payload {
            Value::Array(items) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// The payload coerced to a status token.
    pub fn status_text(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_document_event() {
        let ev = StreamEvent::from_json(
            r#"{"type":"document","payload":"hello","timestamp":"2025-08-04T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ev.kind, EventKind::Document);
        assert_eq!(ev.document_text(), "hello");
        assert_eq!(ev.timestamp, "2025-08-04T10:00:00Z");
    }

    #[test]
    fn test_decode_kind_alias() {
        let ev = StreamEvent::from_json(r#"{"kind":"log","payload":{"msg":"x"}}"#).unwrap();
        assert_eq!(ev.kind, EventKind::Log);
        assert_eq!(ev.timestamp, "");
    }

    #[test]
    fn test_unknown_kind_decodes() {
        let ev = StreamEvent::from_json(r#"{"type":"telemetry","payload":1,"timestamp":"t"}"#)
            .unwrap();
        assert_eq!(ev.kind, EventKind::Unknown("telemetry".into()));
        assert!(!ev.kind.is_known());
        assert_eq!(ev.kind.as_str(), "telemetry");
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(StreamEvent::from_json("{not json").is_err());
        assert!(StreamEvent::from_json(r#"{"payload":1}"#).is_err());
    }

    #[test]
    fn test_missing_payload_is_null() {
        let ev = StreamEvent::from_json(r#"{"type":"document"}"#).unwrap();
        assert_eq!(ev.payload, Value::Null);
        assert_eq!(ev.document_text(), "");
    }

    #[test]
    fn test_kind_serializes_as_type() {
        let ev = StreamEvent::new("export", json!("ready"), "t");
        let text = serde_json::to_string(&ev).unwrap();
        assert!(text.contains(r#""type":"export""#));
        let back = StreamEvent::from_json(&text).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn test_payload_coercions() {
        let ev = StreamEvent::new("document", json!({"markdown": "x"}), "");
        assert_eq!(ev.document_text(), r#"{"markdown":"x"}"#);

        let ev = StreamEvent::new("source", json!(["u1", "u2"]), "");
        assert_eq!(ev.source_list(), vec![json!("u1"), json!("u2")]);
        let ev = StreamEvent::new("source", json!({"url": "u1"}), "");
        assert!(ev.source_list().is_empty());

        let ev = StreamEvent::new("status", json!("running"), "");
        assert_eq!(ev.status_text(), "running");
        let ev = StreamEvent::new("export", json!(3), "");
        assert_eq!(ev.status_text(), "3");
    }
}
