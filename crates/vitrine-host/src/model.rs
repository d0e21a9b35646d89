//! The host-model trait and its capability surface.
//!
//! [`HostModel`] is what user code implements to make an object mirrorable.
//! Only two things are required: a type label and a per-key field assignment
//! (the permissive default setter target). Everything else is an optional
//! capability the resolver and the change bridge probe for.
//!
//! Models are shared as `Arc<RwLock<dyn HostModel>>`; the sync machinery
//! holds a [`ModelHandle`] — weak by default, so the machinery observes the
//! model's lifetime without owning it.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use vitrine_core::{StateDict, StateError, StateValue};

use crate::signals::SignalGroup;

/// A model shared between user code and the sync machinery.
pub type SharedModel = Arc<RwLock<dyn HostModel>>;

/// An object whose state can be mirrored to a view.
pub trait HostModel: Send + Sync + 'static {
    /// A stable, human-readable label for the model's concrete type. Used
    /// in the widget identity sent to the front end and in error messages.
    fn type_label(&self) -> &str;

    /// Assign one state key. This is the permissive default setter target:
    /// implementations should accept the value without imposing extra
    /// validation beyond their own field semantics, and any rejection
    /// propagates unchanged to whoever applied the inbound update.
    fn assign(&mut self, key: &str, value: StateValue) -> Result<(), StateError>;

    /// Plain-text representation for the display fallback.
    fn repr(&self) -> String {
        format!("<{}>", self.type_label())
    }

    /// Escape-hatch state accessor; wins over every other getter shape.
    fn custom_state(&self) -> Option<&dyn CustomStateAccess> {
        None
    }

    /// Mutable escape-hatch accessor, for models whose custom accessor also
    /// handles writes.
    fn custom_state_mut(&mut self) -> Option<&mut dyn CustomStateAccess> {
        None
    }

    /// Plain structured-record shape: all fields serialize to a dict.
    fn record(&self) -> Option<&dyn RecordState> {
        None
    }

    /// Observable-attributes shape with explicitly synced fields.
    fn observable(&self) -> Option<&dyn ObservableModel> {
        None
    }

    /// Validated-schema shape with its own serialization facility.
    fn schema(&self) -> Option<&dyn SchemaModel> {
        None
    }

    /// Compact-struct shape with a "to plain value" facility.
    fn compact(&self) -> Option<&dyn CompactStruct> {
        None
    }

    /// The conventional change-event group, if the model carries one.
    fn event_group(&self) -> Option<SignalGroup> {
        None
    }

    /// Fallback enumeration of every event-group-shaped member, for models
    /// that keep their group under an unconventional name.
    fn scan_event_groups(&self) -> Vec<SignalGroup> {
        Vec::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability traits
// ─────────────────────────────────────────────────────────────────────────────

/// Escape hatch: the model serializes (and optionally applies) its own state.
pub trait CustomStateAccess {
    /// Produce the state dict, optionally restricted to `include` keys.
    fn state(&self, include: Option<&HashSet<String>>) -> Result<StateDict, StateError>;

    /// `true` if [`CustomStateAccess::apply_state`] is implemented; lets the
    /// setter resolver pick this capability without a mutable probe.
    fn handles_set_state(&self) -> bool {
        false
    }

    /// Apply an inbound state dict.
    fn apply_state(&mut self, state: StateDict) -> Result<(), StateError> {
        let _ = state;
        Err(StateError::InvalidShape(
            "custom state accessor does not handle writes".to_string(),
        ))
    }
}

/// Plain structured record: full-state export via structural serialization.
pub trait RecordState {
    /// Serialize every field into a state dict.
    fn record_state(&self) -> Result<StateDict, StateError>;
}

/// Observable model: fields tagged for sync plus a notifier.
pub trait ObservableModel {
    /// Names of the fields flagged as syncable.
    fn synced_fields(&self) -> Vec<String>;

    /// Export the synced fields, optionally restricted to `include`.
    fn observable_state(&self, include: Option<&HashSet<String>>)
    -> Result<StateDict, StateError>;

    /// The observe/unobserve registry change events are delivered through.
    fn signals(&self) -> SignalGroup;
}

/// Validated-schema model: serialization delegated to the schema library.
pub trait SchemaModel {
    /// Serialize via the schema's own facility.
    fn serialize_state(&self, include: Option<&HashSet<String>>) -> Result<StateDict, StateError>;
}

/// Compact struct: converts itself to a plain value tree.
pub trait CompactStruct {
    /// Convert to a plain state value; must produce an object at the root.
    fn to_plain(&self) -> Result<StateValue, StateError>;
}

/// Helper for [`RecordState`] implementations: serialize any
/// [`serde::Serialize`] record into a state dict.
pub fn record_state_of<T: serde::Serialize>(record: &T) -> Result<StateDict, StateError> {
    match StateValue::from_serialize(record)? {
        StateValue::Object(dict) => Ok(dict),
        other => Err(StateError::InvalidShape(format!(
            "record serialized to a non-object value: {other:?}"
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ModelHandle — weak-by-default reference to a shared model
// ─────────────────────────────────────────────────────────────────────────────

/// Reference to a shared model.
///
/// Weak by default: the sync machinery observes the model's lifetime but
/// never extends it. [`ModelHandle::strong`] is the degraded mode for
/// callers that cannot share ownership — the model then lives until the
/// handle is dropped, and the bundle warns about it at construction.
#[derive(Clone)]
pub enum ModelHandle {
    /// Non-owning reference; upgrades fail once the model is dropped.
    Weak(Weak<RwLock<dyn HostModel>>),
    /// Owning reference; keeps the model alive.
    Strong(SharedModel),
}

impl ModelHandle {
    /// Create a weak handle to `model`.
    #[must_use]
    pub fn weak(model: &SharedModel) -> Self {
        Self::Weak(Arc::downgrade(model))
    }

    /// Create an owning handle (degraded mode).
    #[must_use]
    pub fn strong(model: SharedModel) -> Self {
        Self::Strong(model)
    }

    /// `true` for the weak (preferred) flavor.
    #[must_use]
    pub fn is_weak(&self) -> bool {
        matches!(self, Self::Weak(_))
    }

    /// Upgrade to a usable reference; `None` once the model is gone.
    #[must_use]
    pub fn upgrade(&self) -> Option<SharedModel> {
        match self {
            Self::Weak(weak) => weak.upgrade(),
            Self::Strong(model) => Some(Arc::clone(model)),
        }
    }

    /// `true` while the model is reachable.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        match self {
            Self::Weak(weak) => weak.strong_count() > 0,
            Self::Strong(_) => true,
        }
    }

    /// Stable identity of the model allocation. Derived from the address,
    /// not a hash — host models are not required to be hashable.
    #[must_use]
    pub fn address(&self) -> usize {
        match self {
            Self::Weak(weak) => weak.as_ptr().cast::<()>() as usize,
            Self::Strong(model) => Arc::as_ptr(model).cast::<()>() as usize,
        }
    }

    /// Mutate the model and then fire its change notifier for each field in
    /// `changed` — with the write guard already released, so listeners are
    /// free to read the model back.
    ///
    /// Returns `None` (without calling `f`) if the model has been dropped.
    pub fn mutate<R>(&self, changed: &[&str], f: impl FnOnce(&mut dyn HostModel) -> R) -> Option<R> {
        let model = self.upgrade()?;
        let (result, groups) = {
            let mut guard = model.write();
            let result = f(&mut *guard);
            let mut groups = match guard.event_group() {
                Some(group) => vec![group],
                None => guard.scan_event_groups(),
            };
            if groups.is_empty() {
                if let Some(observable) = guard.observable() {
                    groups.push(observable.signals());
                }
            }
            (result, groups)
        };
        for group in &groups {
            for field in changed {
                group.emit(field);
            }
        }
        Some(result)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flavor = if self.is_weak() { "weak" } else { "strong" };
        write!(f, "ModelHandle({flavor}, {:#x})", self.address())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        value: i64,
    }

    impl HostModel for Plain {
        fn type_label(&self) -> &str {
            "Plain"
        }

        fn assign(&mut self, key: &str, value: StateValue) -> Result<(), StateError> {
            match (key, value) {
                ("value", StateValue::Number(n)) => {
                    self.value = n.as_i64().unwrap_or_default();
                    Ok(())
                }
                (key, _) => Err(StateError::Assign {
                    key: key.to_string(),
                    message: "no such field".to_string(),
                }),
            }
        }
    }

    fn shared(model: Plain) -> SharedModel {
        Arc::new(RwLock::new(model))
    }

    #[test]
    fn weak_handle_dies_with_the_model() {
        let model = shared(Plain { value: 0 });
        let handle = ModelHandle::weak(&model);
        assert!(handle.is_alive());
        drop(model);
        assert!(!handle.is_alive());
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn strong_handle_keeps_the_model_alive() {
        let model = shared(Plain { value: 0 });
        let handle = ModelHandle::strong(Arc::clone(&model));
        drop(model);
        assert!(handle.is_alive());
        assert!(handle.upgrade().is_some());
    }

    #[test]
    fn address_is_stable_across_flavors() {
        let model = shared(Plain { value: 0 });
        let weak = ModelHandle::weak(&model);
        let strong = ModelHandle::strong(Arc::clone(&model));
        assert_eq!(weak.address(), strong.address());
    }

    #[test]
    fn mutate_skips_dead_models() {
        let model = shared(Plain { value: 0 });
        let handle = ModelHandle::weak(&model);
        drop(model);
        assert_eq!(handle.mutate(&["value"], |_| 42), None);
    }

    #[test]
    fn mutate_emits_after_releasing_the_guard() {
        struct Evented {
            inner: Plain,
            events: SignalGroup,
        }
        impl HostModel for Evented {
            fn type_label(&self) -> &str {
                "Evented"
            }
            fn assign(&mut self, key: &str, value: StateValue) -> Result<(), StateError> {
                self.inner.assign(key, value)
            }
            fn event_group(&self) -> Option<SignalGroup> {
                Some(self.events.clone())
            }
        }

        let model: SharedModel = Arc::new(RwLock::new(Evented {
            inner: Plain { value: 0 },
            events: SignalGroup::new(),
        }));
        let handle = ModelHandle::weak(&model);

        // The listener takes a read lock: it would deadlock if emission
        // happened while the mutate guard was still held.
        let seen = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
        let seen_in_listener = Arc::clone(&seen);
        let read_handle = ModelHandle::weak(&model);
        let group = model.read().event_group().unwrap();
        let _ = group.connect(Arc::new(move |field| {
            let model = read_handle.upgrade().unwrap();
            let _guard = model.read();
            seen_in_listener.lock().push(field.to_string());
        }));

        let result = handle.mutate(&["value"], |m| {
            m.assign("value", StateValue::from(7i64)).unwrap();
            "done"
        });
        assert_eq!(result, Some("done"));
        assert_eq!(*seen.lock(), vec!["value"]);
    }
}
