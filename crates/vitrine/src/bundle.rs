//! The sync controller: one [`ViewBundle`] per displayed model.
//!
//! A bundle owns the glue between a host model and its front-end view: the
//! resolved state accessors, the channel, the promoted file assets, and the
//! (at most one) change notifier pushing model edits to the peer.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, warn};

use vitrine_assets::{AssetContents, FileAsset, SubscriptionId, try_file_asset};
use vitrine_channel::{
    Channel, ChannelProvider, ChannelRegistry, InboundMessage, LivenessProbe, ModelKey,
    global_registry,
};
use vitrine_core::wire::{TARGET_NAME, WireMessage, handshake_data, handshake_metadata};
use vitrine_core::{StateDict, StateValue, join_buffers, split_buffers};
use vitrine_host::{
    ChangeListener, Disconnector, ModelHandle, StateGetter, StateSetter, connect_change_bridge,
};

use crate::display;
use crate::errors::BundleError;
use crate::platform;

/// State key holding the front-end module source (or a path to it).
pub const ESM_KEY: &str = "_esm";

/// State key carrying the model's type label to the front end.
pub const ID_KEY: &str = "_vitrine_id";

/// Placeholder front-end module used when no `_esm` is provided.
pub const DEFAULT_ESM: &str = r#"export function render({ model, el }) {
  el.textContent = "no front-end module: set the `_esm` state key";
}
"#;

/// Knobs for [`ViewBundle`] construction.
#[derive(Clone, Copy, Debug)]
pub struct BundleOptions {
    /// Probe the model for a change notifier when binding model-to-view.
    pub autodetect_observer: bool,
    /// Bind both directions immediately at construction.
    pub follow_changes: bool,
    /// Suppress the display envelope (headless use).
    pub no_view: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            autodetect_observer: true,
            follow_changes: true,
            no_view: false,
        }
    }
}

struct BoundAsset {
    asset: Arc<FileAsset>,
    subscription: SubscriptionId,
}

/// Synchronizes one host model with one front-end view.
///
/// Dropping the last handle unbinds everything and releases the model's
/// channel from the registry, which closes it.
pub struct ViewBundle {
    model: ModelHandle,
    getter: StateGetter,
    setter: StateSetter,
    channel: Arc<dyn Channel>,
    key: ModelKey,
    registry: &'static ChannelRegistry,
    autodetect_observer: bool,
    no_view: bool,
    extra_state: Mutex<StateDict>,
    assets: Mutex<Vec<BoundAsset>>,
    bridge: Mutex<Option<Disconnector>>,
}

impl ViewBundle {
    /// Build a bundle against the process-wide channel registry.
    pub fn new(
        model: ModelHandle,
        provider: &dyn ChannelProvider,
        options: BundleOptions,
        extra_state: StateDict,
    ) -> Result<Arc<Self>, BundleError> {
        Self::with_registry(global_registry(), model, provider, options, extra_state)
    }

    /// Build a bundle against an explicit registry.
    ///
    /// Accessor resolution happens here, so a model with no usable state
    /// shape fails on first use rather than on first send. Single-line
    /// extra-state strings naming an existing front-end source file are
    /// promoted to watched [`FileAsset`]s.
    pub fn with_registry(
        registry: &'static ChannelRegistry,
        model: ModelHandle,
        provider: &dyn ChannelProvider,
        options: BundleOptions,
        mut extra_state: StateDict,
    ) -> Result<Arc<Self>, BundleError> {
        if !model.is_weak() {
            warn!(
                "bundle holds a strong model reference; the model stays alive as long as the bundle does"
            );
        }
        let shared = model.upgrade().ok_or(BundleError::ModelDropped)?;
        let (getter, setter, label) = {
            let guard = shared.read();
            (
                StateGetter::resolve(&*guard)?,
                StateSetter::resolve(&*guard),
                guard.type_label().to_owned(),
            )
        };
        drop(shared);

        extra_state.insert_default(ESM_KEY, DEFAULT_ESM);
        let _ = extra_state.insert(ID_KEY, label.as_str());

        let key = ModelKey(model.address());
        let probe: LivenessProbe = {
            let handle = model.clone();
            Box::new(move || handle.is_alive())
        };
        let module_version = env!("CARGO_PKG_VERSION");
        let channel = registry.get_or_create(
            key,
            probe,
            provider,
            TARGET_NAME,
            handshake_metadata(),
            || handshake_data(module_version),
        )?;
        debug!(model = label, channel = %channel.id(), "view bundle created");

        let bundle = Arc::new(Self {
            model,
            getter,
            setter,
            channel,
            key,
            registry,
            autodetect_observer: options.autodetect_observer,
            no_view: options.no_view,
            extra_state: Mutex::new(extra_state),
            assets: Mutex::new(Vec::new()),
            bridge: Mutex::new(None),
        });
        bundle.promote_file_assets();
        if options.follow_changes {
            bundle.bind(true, true);
        }
        Ok(bundle)
    }

    /// The channel backing this bundle.
    #[must_use]
    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// The model id shared with the front end (the channel id).
    #[must_use]
    pub fn model_id(&self) -> &str {
        self.channel.id().as_str()
    }

    /// Snapshot of the bundle-owned extra state.
    #[must_use]
    pub fn extra_state(&self) -> StateDict {
        self.extra_state.lock().clone()
    }

    /// `true` while a change notifier is connected.
    #[must_use]
    pub fn is_bridged(&self) -> bool {
        self.bridge.lock().is_some()
    }

    /// Push model state to the peer.
    ///
    /// The resolved getter's state is merged with the bundle's extra state
    /// (extra state wins on key conflicts), then filtered to `include` when
    /// given. An empty result sends nothing. A dropped model is a no-op, as
    /// is a model whose write guard is still held on this thread (a change
    /// event fired while an inbound update is being applied is an echo of
    /// state the peer already has).
    pub fn send_state(&self, include: Option<&HashSet<String>>) -> Result<(), BundleError> {
        let Some(model) = self.model.upgrade() else {
            debug!("model dropped; skipping state send");
            return Ok(());
        };
        let Some(guard) = model.try_read() else {
            debug!("model is mid-update; suppressing the echo push");
            return Ok(());
        };
        let mut state = self.getter.get(&*guard, include)?;
        drop(guard);
        state.merge(self.extra_state.lock().clone());
        if let Some(include) = include {
            state.retain(|key| include.contains(key));
        }
        if state.is_empty() {
            return Ok(());
        }
        let (state, buffer_paths, buffers) = split_buffers(state);
        let message = WireMessage::Update {
            state,
            buffer_paths,
        };
        self.channel.send(message.to_json(), buffers)?;
        Ok(())
    }

    /// Apply one inbound message.
    ///
    /// `update` joins the message's buffers back into its state and applies
    /// it through the resolved setter; `request_state` answers with a full
    /// snapshot. Unknown methods error with the offending name.
    pub fn handle_message(&self, message: &InboundMessage) -> Result<(), BundleError> {
        match WireMessage::parse(&message.data)? {
            WireMessage::Update {
                state,
                buffer_paths,
            } => {
                let mut state = StateDict::from_json_map(state);
                join_buffers(&mut state, &buffer_paths, message.buffers.clone())?;
                let model = self.model.upgrade().ok_or(BundleError::ModelDropped)?;
                let mut guard = model.write();
                self.setter.set(&mut *guard, state)?;
                Ok(())
            }
            WireMessage::RequestState => self.send_state(None),
        }
    }

    /// Connect the sync directions.
    ///
    /// `view_to_model` installs the inbound handler and sends a full
    /// snapshot so the peer starts from current state. `model_to_view`
    /// connects a change notifier; if one is already connected this warns
    /// and keeps the existing one, so a model is never double-synced.
    pub fn bind(self: &Arc<Self>, model_to_view: bool, view_to_model: bool) {
        if view_to_model {
            let weak = Arc::downgrade(self);
            self.channel.set_handler(Some(Arc::new(move |message: InboundMessage| {
                let Some(bundle) = weak.upgrade() else { return };
                // Degrade to log-and-continue here: a bad message must not
                // tear down the handler for later good ones.
                if let Err(err) = bundle.handle_message(&message) {
                    error!(error = %err, "failed to apply inbound message");
                }
            })));
            if let Err(err) = self.send_state(None) {
                warn!(error = %err, "failed to send initial snapshot");
            }
        }
        if model_to_view {
            self.connect_notifier();
        }
    }

    /// Disconnect both directions: remove the inbound handler, disconnect
    /// the change notifier, and drop promoted assets (stopping any watch).
    pub fn unbind(&self) {
        self.channel.set_handler(None);
        if let Some(disconnect) = self.bridge.lock().take() {
            disconnect();
        }
        for bound in self.assets.lock().drain(..) {
            bound.asset.unsubscribe(bound.subscription);
        }
    }

    /// The display envelope for this widget, or `None` in no-view mode.
    #[must_use]
    pub fn mime_bundle(&self) -> Option<(Value, Value)> {
        if self.no_view {
            return None;
        }
        platform::init_hosted_runtime();
        let repr = self
            .model
            .upgrade()
            .map_or_else(|| "<dropped model>".to_owned(), |m| m.read().repr());
        Some(display::mime_bundle(&repr, self.model_id()))
    }

    fn connect_notifier(self: &Arc<Self>) {
        if !self.autodetect_observer {
            return;
        }
        let mut bridge = self.bridge.lock();
        if bridge.is_some() {
            warn!("a change notifier is already connected; ignoring the second bind");
            return;
        }
        let Some(model) = self.model.upgrade() else {
            return;
        };
        let weak = Arc::downgrade(self);
        let push: ChangeListener = Arc::new(move |field: &str| {
            let Some(bundle) = weak.upgrade() else { return };
            let mut only = HashSet::new();
            let _ = only.insert(field.to_owned());
            if let Err(err) = bundle.send_state(Some(&only)) {
                warn!(field, error = %err, "failed to push changed field");
            }
        });
        match connect_change_bridge(&*model.read(), push) {
            Some(disconnect) => *bridge = Some(disconnect),
            None => {
                warn!("no change notifier found; model-to-view sync requires manual send_state");
            }
        }
    }

    fn promote_file_assets(self: &Arc<Self>) {
        let candidates: Vec<(String, String)> = self
            .extra_state
            .lock()
            .iter()
            .filter_map(|(key, value)| match value {
                StateValue::String(text) => Some((key.clone(), text.clone())),
                _ => None,
            })
            .collect();

        for (key, candidate) in candidates {
            let Some(asset) = try_file_asset(&candidate) else {
                continue;
            };
            if platform::hmr_enabled() {
                if let Err(err) = asset.watch() {
                    warn!(key = %key, error = %err, "failed to watch file asset");
                }
            }
            match asset.current_text() {
                Ok(text) => {
                    let _ = self.extra_state.lock().insert(key.clone(), text);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "failed to read file asset");
                    continue;
                }
            }
            debug!(key = %key, path = %asset.path().display(), "promoted extra-state path to file asset");

            let asset = Arc::new(asset);
            let weak = Arc::downgrade(self);
            let state_key = key;
            let subscription = asset.on_change(Arc::new(move |text: &str| {
                let Some(bundle) = weak.upgrade() else { return };
                let _ = bundle.extra_state.lock().insert(state_key.clone(), text);
                let mut only = HashSet::new();
                let _ = only.insert(state_key.clone());
                if let Err(err) = bundle.send_state(Some(&only)) {
                    warn!(key = %state_key, error = %err, "failed to push changed asset");
                }
            }));
            self.assets.lock().push(BoundAsset {
                asset,
                subscription,
            });
        }
    }
}

impl Drop for ViewBundle {
    fn drop(&mut self) {
        self.unbind();
        self.registry.release(self.key);
    }
}

impl std::fmt::Debug for ViewBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewBundle")
            .field("model", &self.model)
            .field("getter", &self.getter)
            .field("setter", &self.setter)
            .field("channel", self.channel.id())
            .field("bridged", &self.is_bridged())
            .finish_non_exhaustive()
    }
}
