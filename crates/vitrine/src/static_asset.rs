//! Hoisted static assets shared across widget instances.

use std::sync::Arc;

use serde_json::{Map, json};
use tracing::{debug, warn};

use vitrine_assets::{AssetContents, SubscriptionId, VirtualAsset, try_file_asset};
use vitrine_channel::{Channel, ChannelProvider};
use vitrine_core::wire::{TARGET_NAME, WireMessage, handshake_data, handshake_metadata};

use crate::errors::BundleError;
use crate::platform;

/// A front-end asset (module source, stylesheet) hoisted onto its own
/// channel so multiple widget instances can share one copy.
///
/// The asset's text is pushed once at construction and again on every
/// content change. State entries reference it through
/// [`placement_id`](Self::placement_id). Dropping the asset closes its
/// channel.
pub struct StaticAsset {
    channel: Arc<dyn Channel>,
    contents: Arc<dyn AssetContents>,
    subscription: SubscriptionId,
}

impl StaticAsset {
    /// Hoist `data` onto a fresh channel.
    ///
    /// `data` is either inline text or a path to a front-end source file;
    /// paths become watched file assets when the dev toggle is set.
    pub fn new(data: &str, provider: &dyn ChannelProvider) -> Result<Self, BundleError> {
        let contents: Arc<dyn AssetContents> = match try_file_asset(data) {
            Some(file) => {
                if platform::hmr_enabled() {
                    if let Err(err) = file.watch() {
                        warn!(path = %file.path().display(), error = %err,
                            "failed to watch static asset");
                    }
                }
                Arc::new(file)
            }
            None => Arc::new(VirtualAsset::new(data)),
        };
        Self::from_contents(contents, provider)
    }

    /// Hoist already-constructed contents onto a fresh channel.
    pub fn from_contents(
        contents: Arc<dyn AssetContents>,
        provider: &dyn ChannelProvider,
    ) -> Result<Self, BundleError> {
        let channel = provider.open(
            TARGET_NAME,
            handshake_metadata(),
            handshake_data(env!("CARGO_PKG_VERSION")),
        )?;
        send_contents(&channel, &contents.current_text()?)?;

        let push_channel = Arc::clone(&channel);
        let subscription = contents.on_change(Arc::new(move |text: &str| {
            if let Err(err) = send_contents(&push_channel, text) {
                warn!(error = %err, "failed to push static asset update");
            }
        }));
        debug!(channel = %channel.id(), "static asset hoisted");

        Ok(Self {
            channel,
            contents,
            subscription,
        })
    }

    /// The value to embed in widget state wherever this asset is used.
    #[must_use]
    pub fn placement_id(&self) -> String {
        format!("vitrine-static-asset:{}", self.channel.id())
    }

    /// The asset's current text.
    pub fn current_text(&self) -> Result<String, BundleError> {
        Ok(self.contents.current_text()?)
    }
}

impl Drop for StaticAsset {
    fn drop(&mut self) {
        self.contents.unsubscribe(self.subscription);
        self.channel.close();
    }
}

fn send_contents(channel: &Arc<dyn Channel>, text: &str) -> Result<(), BundleError> {
    let mut state = Map::new();
    let _ = state.insert("data".to_owned(), json!(text));
    let message = WireMessage::Update {
        state,
        buffer_paths: Vec::new(),
    };
    channel.send(message.to_json(), Vec::new())?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
