//! Display envelope: the mime bundle a notebook renders for a widget.

use serde_json::{Value, json};
use vitrine_core::wire::{PROTOCOL_VERSION_MAJOR, PROTOCOL_VERSION_MINOR, WIDGET_MIME_TYPE};

use crate::platform;

/// Longest plain-text representation shown before truncation.
const REPR_LIMIT: usize = 110;

/// Truncate a representation string for the `text/plain` fallback.
#[must_use]
pub fn truncate_repr(repr: &str) -> String {
    let mut chars = repr.char_indices();
    match chars.nth(REPR_LIMIT) {
        Some((cut, _)) => format!("{}…", &repr[..cut]),
        None => repr.to_owned(),
    }
}

/// Assemble the `(data, metadata)` mime bundle for a live widget.
///
/// `data` carries the plain-text fallback plus the widget view entry;
/// `metadata` is empty unless the hosted runtime wants its widget-manager
/// hint alongside the view entry.
#[must_use]
pub fn mime_bundle(repr: &str, model_id: &str) -> (Value, Value) {
    assemble(repr, model_id, platform::display_metadata_hint())
}

fn assemble(repr: &str, model_id: &str, hint: Option<Value>) -> (Value, Value) {
    let data = json!({
        "text/plain": truncate_repr(repr),
        WIDGET_MIME_TYPE: {
            "version_major": PROTOCOL_VERSION_MAJOR,
            "version_minor": PROTOCOL_VERSION_MINOR,
            "model_id": model_id,
        },
    });
    let metadata = match hint {
        Some(hint) => json!({ WIDGET_MIME_TYPE: hint }),
        None => json!({}),
    };
    (data, metadata)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
