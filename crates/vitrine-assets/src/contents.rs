//! The [`AssetContents`] trait and the in-memory [`VirtualAsset`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::errors::AssetError;

/// Callback invoked with the asset's new text after a change.
pub type AssetListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle for removing a previously registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A source of front-end text that can change over time.
pub trait AssetContents: Send + Sync {
    /// The asset's current text.
    fn current_text(&self) -> Result<String, AssetError>;

    /// Register `listener` to run after every content change.
    fn on_change(&self, listener: AssetListener) -> SubscriptionId;

    /// Remove a change listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

// ─────────────────────────────────────────────────────────────────────────────
// Listener registry
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered set of listeners keyed by subscription id.
///
/// Emission runs against a snapshot taken under the lock, so a listener may
/// subscribe or unsubscribe from inside its own callback without deadlock.
pub(crate) struct ListenerSet<T: ?Sized> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn Fn(&T) + Send + Sync>)>>,
}

impl<T: ?Sized> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> ListenerSet<T> {
    pub(crate) fn add(&self, listener: Arc<dyn Fn(&T) + Send + Sync>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) {
        self.listeners.lock().retain(|(held, _)| *held != id);
    }

    pub(crate) fn emit(&self, value: &T) {
        let snapshot: Vec<_> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// VirtualAsset
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory asset contents with no backing file.
///
/// Changes come from [`set_text`](Self::set_text) rather than the
/// filesystem; everything else behaves like a
/// [`FileAsset`](crate::FileAsset).
#[derive(Default)]
pub struct VirtualAsset {
    text: Mutex<String>,
    changed: ListenerSet<str>,
}

impl VirtualAsset {
    /// Create a virtual asset holding `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
            changed: ListenerSet::default(),
        }
    }

    /// Replace the contents and notify change listeners.
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        *self.text.lock() = text.clone();
        self.changed.emit(&text);
    }
}

impl AssetContents for VirtualAsset {
    fn current_text(&self) -> Result<String, AssetError> {
        Ok(self.text.lock().clone())
    }

    fn on_change(&self, listener: AssetListener) -> SubscriptionId {
        self.changed.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.changed.remove(id);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_asset_returns_its_text() {
        let asset = VirtualAsset::new("export default {}");
        assert_eq!(asset.current_text().unwrap(), "export default {}");
    }

    #[test]
    fn set_text_notifies_change_listeners() {
        let asset = VirtualAsset::new("before");
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        let _ = asset.on_change(Arc::new(move |text| sink.lock().push(text.to_owned())));

        asset.set_text("after");

        assert_eq!(asset.current_text().unwrap(), "after");
        assert_eq!(*seen.lock(), vec!["after".to_owned()]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let asset = VirtualAsset::new("");
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let id = asset.on_change(Arc::new(move |_| *sink.lock() += 1));

        asset.set_text("one");
        asset.unsubscribe(id);
        asset.set_text("two");

        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn unsubscribing_twice_is_harmless() {
        let asset = VirtualAsset::new("");
        let id = asset.on_change(Arc::new(|_| {}));
        asset.unsubscribe(id);
        asset.unsubscribe(id);
    }
}
