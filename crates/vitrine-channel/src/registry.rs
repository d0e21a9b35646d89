//! Process-wide channel registry keyed by model identity.
//!
//! One channel per model instance: the first request for a model opens a
//! channel (producing the handshake snapshot lazily, exactly once); later
//! requests reuse it. Keys derive from the model allocation's address, not
//! its hash — host models are not required to be hashable.
//!
//! Rust has no garbage-collection finalizer, so teardown is two-tier:
//! whoever owns the sync controller releases the entry deterministically on
//! drop, and every `get_or_create` additionally sweeps entries whose
//! liveness probe reports the model dead, closing their channels.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::channel::{Channel, ChannelError, ChannelProvider};

/// Identity key for a model instance (its allocation address).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelKey(pub usize);

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Reports whether the model behind an entry is still reachable.
pub type LivenessProbe = Box<dyn Fn() -> bool + Send>;

struct Entry {
    alive: LivenessProbe,
    channel: Arc<dyn Channel>,
}

/// Identity-keyed map of open channels.
#[derive(Default)]
pub struct ChannelRegistry {
    entries: Mutex<HashMap<ModelKey, Entry>>,
}

impl ChannelRegistry {
    /// Create an empty registry. Most callers want [`global_registry`];
    /// a dedicated instance keeps tests hermetic.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the channel for `key`, opening one if needed.
    ///
    /// `init` produces the initial handshake payload and runs only when a
    /// channel is actually opened, so the snapshot exists before the peer
    /// can possibly request state.
    pub fn get_or_create(
        &self,
        key: ModelKey,
        alive: LivenessProbe,
        provider: &dyn ChannelProvider,
        target: &str,
        metadata: Value,
        init: impl FnOnce() -> Value,
    ) -> Result<Arc<dyn Channel>, ChannelError> {
        self.reap();

        if let Some(entry) = self.entries.lock().get(&key) {
            return Ok(Arc::clone(&entry.channel));
        }

        // Open outside the lock; providers may log or call back.
        let channel = provider.open(target, metadata, init())?;
        let channel_for_entry = Arc::clone(&channel);
        let previous = self.entries.lock().insert(
            key,
            Entry {
                alive,
                channel: channel_for_entry,
            },
        );
        if let Some(previous) = previous {
            // Lost a race with another opener for the same model; keep the
            // newest channel and close the displaced one.
            previous.channel.close();
        }
        debug!(%key, channel = %channel.id(), "registered channel");
        Ok(channel)
    }

    /// Remove and close the channel for `key`, if present.
    pub fn release(&self, key: ModelKey) {
        if let Some(entry) = self.entries.lock().remove(&key) {
            entry.channel.close();
            debug!(%key, "released channel");
        }
    }

    /// Sweep entries whose model is no longer reachable, closing their
    /// channels.
    pub fn reap(&self) {
        self.entries.lock().retain(|key, entry| {
            if (entry.alive)() {
                true
            } else {
                entry.channel.close();
                debug!(%key, "reaped channel for dropped model");
                false
            }
        });
    }

    /// `true` if `key` currently maps to a channel.
    #[must_use]
    pub fn contains(&self, key: ModelKey) -> bool {
        self.entries.lock().contains_key(&key)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` when no channels are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// The process-wide registry used by default.
pub fn global_registry() -> &'static ChannelRegistry {
    static REGISTRY: LazyLock<ChannelRegistry> = LazyLock::new(ChannelRegistry::new);
    &REGISTRY
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
