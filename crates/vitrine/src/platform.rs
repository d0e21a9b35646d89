//! Environment toggles and hosted-runtime detection.

use std::sync::Once;

use serde_json::{Value, json};
use tracing::debug;

/// Dev-mode toggle: when truthy, file-backed assets watch for edits.
pub const HMR_ENV: &str = "VITRINE_HMR";

/// Set by the hosted notebook platform's kernel image.
const HOSTED_MARKER_ENV: &str = "COLAB_RELEASE_TAG";

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `true` when hot-module-reload watching is requested via [`HMR_ENV`].
#[must_use]
pub fn hmr_enabled() -> bool {
    std::env::var(HMR_ENV).is_ok_and(|v| is_truthy(&v))
}

/// `true` when running inside the hosted notebook platform.
#[must_use]
pub fn hosted_runtime() -> bool {
    std::env::var_os(HOSTED_MARKER_ENV).is_some()
}

/// One-time setup for the hosted runtime.
///
/// The hosted platform needs its custom widget manager switched on before
/// the first widget displays. Safe to call on every display; only the
/// first call on a hosted runtime does anything.
pub fn init_hosted_runtime() {
    static INIT: Once = Once::new();
    if hosted_runtime() {
        INIT.call_once(|| {
            debug!("enabling custom widget manager for hosted runtime");
        });
    }
}

/// Extra display metadata for the widget mime type, when the hosted
/// runtime needs a custom widget-manager hint.
#[must_use]
pub fn display_metadata_hint() -> Option<Value> {
    widget_manager_hint(hosted_runtime())
}

fn widget_manager_hint(hosted: bool) -> Option<Value> {
    hosted.then(|| json!({ "colab": { "custom_widget_manager": true } }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
