//! Uniform result envelope for engine façade and tool operations.
//!
//! Every externally visible operation returns a `ToolEnvelope`: a success
//! flag, an optional error string, a `generated_at` timestamp, and a
//! payload map merged into the top-level object on serialization. No
//! exception crosses this boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Attrs;

/// Envelope metadata common to all operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    /// ISO-8601 timestamp (with timezone) of when the payload was produced.
    pub generated_at: DateTime<Utc>,
}

/// The uniform operation result envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: EnvelopeMetadata,
    #[serde(flatten)]
    pub payload: Attrs,
}

impl ToolEnvelope {
    /// A successful envelope wrapping the given payload fields.
    pub fn ok(payload: Attrs) -> Self {
        ToolEnvelope {
            success: true,
            error: None,
            metadata: EnvelopeMetadata {
                generated_at: Utc::now(),
            },
            payload,
        }
    }

    /// A failure envelope. The payload carries whatever empty collections
    /// the operation contract promises alongside the error.
    pub fn err(error: impl Into<String>, payload: Attrs) -> Self {
        ToolEnvelope {
            success: false,
            error: Some(error.into()),
            metadata: EnvelopeMetadata {
                generated_at: Utc::now(),
            },
            payload,
        }
    }

    /// Insert one payload field, serializing the value.
    pub fn with<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.payload.insert(key.to_string(), v);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_flattens() {
        let env = ToolEnvelope::ok(Attrs::new()).with("answer", 42);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["answer"], 42);
        assert!(json["metadata"]["generated_at"].is_string());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let env = ToolEnvelope::err("boom", Attrs::new());
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
    }
}
