//! Wire message shapes and protocol constants.
//!
//! All messages are JSON objects dispatched on a string `method` field, the
//! way the widget front end has always framed them. Binary payloads never
//! appear inside the JSON; they travel alongside, referenced positionally by
//! `buffer_paths`.
//!
//! Parsing is deliberately manual rather than a tagged serde enum: an
//! unknown method must surface as [`ProtocolError::UnrecognizedMethod`]
//! naming the offender, since silently ignoring it would hide version skew
//! between host and front end.

use serde_json::{Map, Value, json};

use crate::errors::ProtocolError;
use crate::path::BufferPath;

/// Channel target understood by the notebook front end.
pub const TARGET_NAME: &str = "jupyter.widget";

/// Mime type of the widget view descriptor in a display bundle.
pub const WIDGET_MIME_TYPE: &str = "application/vnd.jupyter.widget-view+json";

/// Protocol major version. The peer rejects mismatched majors.
pub const PROTOCOL_VERSION_MAJOR: u64 = 2;
/// Protocol minor version.
pub const PROTOCOL_VERSION_MINOR: u64 = 1;
/// Full semantic version sent in the open handshake.
pub const PROTOCOL_VERSION: &str = "2.1.0";

/// Front-end module that hosts the model/view pair.
pub const FRONTEND_MODULE: &str = "vitrine";
/// Model type identifier sent in the handshake.
pub const MODEL_NAME: &str = "AnyModel";
/// View type identifier sent in the handshake.
pub const VIEW_NAME: &str = "AnyView";

/// Initial state payload for a channel open.
#[must_use]
pub fn handshake_data(module_version: &str) -> Value {
    json!({
        "state": {
            "_model_module": FRONTEND_MODULE,
            "_model_name": MODEL_NAME,
            "_model_module_version": module_version,
            "_view_module": FRONTEND_MODULE,
            "_view_name": VIEW_NAME,
            "_view_module_version": module_version,
            "_view_count": null,
        }
    })
}

/// Metadata payload for a channel open.
#[must_use]
pub fn handshake_metadata() -> Value {
    json!({ "version": PROTOCOL_VERSION })
}

/// A parsed inbound (or buildable outbound) channel message.
#[derive(Clone, Debug, PartialEq)]
pub enum WireMessage {
    /// Partial state update in either direction.
    Update {
        /// Plain JSON state (binary leaves already extracted).
        state: Map<String, Value>,
        /// Paths the extracted buffers belong at.
        buffer_paths: Vec<BufferPath>,
    },
    /// The peer asks for a full state snapshot.
    RequestState,
}

impl WireMessage {
    /// Parse a message body, dispatching on its `method` field.
    pub fn parse(data: &Value) -> Result<Self, ProtocolError> {
        let method = data
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::Malformed("missing `method` field".to_string()))?;
        match method {
            "update" => {
                let state = match data.get("state") {
                    Some(Value::Object(map)) => map.clone(),
                    Some(other) => {
                        return Err(ProtocolError::Malformed(format!(
                            "`state` must be an object, got {other}"
                        )));
                    }
                    None => Map::new(),
                };
                let buffer_paths = match data.get("buffer_paths") {
                    Some(value) => serde_json::from_value(value.clone())
                        .map_err(|e| ProtocolError::Malformed(format!("bad `buffer_paths`: {e}")))?,
                    None => Vec::new(),
                };
                Ok(Self::Update {
                    state,
                    buffer_paths,
                })
            }
            "request_state" => Ok(Self::RequestState),
            other => Err(ProtocolError::UnrecognizedMethod(other.to_string())),
        }
    }

    /// Encode into the JSON body sent over the channel.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Update {
                state,
                buffer_paths,
            } => json!({
                "method": "update",
                "state": state,
                "buffer_paths": buffer_paths,
            }),
            Self::RequestState => json!({ "method": "request_state" }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_update() {
        let msg = WireMessage::parse(&json!({
            "method": "update",
            "state": {"value": 3},
            "buffer_paths": [["x", "ar"]],
        }))
        .unwrap();
        let WireMessage::Update {
            state,
            buffer_paths,
        } = msg
        else {
            panic!("expected update, got {msg:?}");
        };
        assert_eq!(state.get("value"), Some(&json!(3)));
        assert_eq!(buffer_paths.len(), 1);
    }

    #[test]
    fn update_without_buffer_paths_is_valid() {
        let msg = WireMessage::parse(&json!({"method": "update", "state": {"v": 1}})).unwrap();
        assert_matches!(msg, WireMessage::Update { buffer_paths, .. } if buffer_paths.is_empty());
    }

    #[test]
    fn parses_request_state() {
        let msg = WireMessage::parse(&json!({"method": "request_state"})).unwrap();
        assert_eq!(msg, WireMessage::RequestState);
    }

    #[test]
    fn unknown_method_is_named() {
        let err = WireMessage::parse(&json!({"method": "bogus"})).unwrap_err();
        assert_matches!(err, ProtocolError::UnrecognizedMethod(m) if m == "bogus");
    }

    #[test]
    fn missing_method_is_malformed() {
        let err = WireMessage::parse(&json!({"state": {}})).unwrap_err();
        assert_matches!(err, ProtocolError::Malformed(_));
    }

    #[test]
    fn update_encodes_canonically() {
        let msg = WireMessage::Update {
            state: Map::new(),
            buffer_paths: Vec::new(),
        };
        assert_eq!(
            msg.to_json(),
            json!({"method": "update", "state": {}, "buffer_paths": []})
        );
    }

    #[test]
    fn handshake_carries_model_view_pair() {
        let data = handshake_data("0.3.1");
        assert_eq!(data["state"]["_model_name"], json!(MODEL_NAME));
        assert_eq!(data["state"]["_view_name"], json!(VIEW_NAME));
        assert_eq!(handshake_metadata()["version"], json!(PROTOCOL_VERSION));
    }
}
