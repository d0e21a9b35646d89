//! Change-event signal groups.
//!
//! A [`SignalGroup`] is the event-group shape the change bridge looks for: a
//! `connect`/`disconnect` pair that fires with the name of the field that
//! changed. Groups have handle semantics — cloning yields another handle to
//! the same listener registry, so a model can hand its group out without
//! borrowing itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Listener invoked with the changed field's name.
pub type ChangeListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Token identifying one connected listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerId(u64);

#[derive(Default)]
struct SignalGroupInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, ChangeListener)>>,
}

/// A clonable handle to a set of change listeners.
#[derive(Clone, Default)]
pub struct SignalGroup {
    inner: Arc<SignalGroupInner>,
}

impl SignalGroup {
    /// Create a group with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; the returned id disconnects it.
    pub fn connect(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if the id was not connected.
    pub fn disconnect(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() < before
    }

    /// Fire the group: every listener sees the changed field's name.
    ///
    /// Listeners run on the emitting thread, against a snapshot of the
    /// registry, so a listener may connect or disconnect without deadlock.
    pub fn emit(&self, field: &str) {
        let snapshot: Vec<ChangeListener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(field);
        }
    }

    /// Number of connected listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// `true` if both handles refer to the same registry.
    #[must_use]
    pub fn same_group(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for SignalGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalGroup")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn emit_reaches_every_listener_with_the_field_name() {
        let group = SignalGroup::new();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            let _ = group.connect(Arc::new(move |field| seen.lock().push(field.to_string())));
        }
        group.emit("value");
        assert_eq!(*seen.lock(), vec!["value", "value"]);
    }

    #[test]
    fn disconnect_removes_exactly_one_listener() {
        let group = SignalGroup::new();
        let id = group.connect(Arc::new(|_| {}));
        let _ = group.connect(Arc::new(|_| {}));
        assert!(group.disconnect(id));
        assert!(!group.disconnect(id), "second disconnect is a no-op");
        assert_eq!(group.listener_count(), 1);
    }

    #[test]
    fn clones_share_the_registry() {
        let group = SignalGroup::new();
        let clone = group.clone();
        let _ = clone.connect(Arc::new(|_| {}));
        assert_eq!(group.listener_count(), 1);
        assert!(group.same_group(&clone));
        assert!(!group.same_group(&SignalGroup::new()));
    }

    #[test]
    fn listener_may_disconnect_during_emit() {
        let group = SignalGroup::new();
        let group_clone = group.clone();
        let id_cell = Arc::new(Mutex::new(None::<ListenerId>));
        let id_for_listener = Arc::clone(&id_cell);
        let id = group.connect(Arc::new(move |_| {
            if let Some(id) = *id_for_listener.lock() {
                let _ = group_clone.disconnect(id);
            }
        }));
        *id_cell.lock() = Some(id);
        group.emit("x");
        assert_eq!(group.listener_count(), 0);
    }
}
