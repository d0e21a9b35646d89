//! The change-notification bridge.
//!
//! Probes a model for a known notifier shape and, when one is found, wires
//! it to an outbound state push. Probe order:
//!
//! a. the conventional event-group accessor
//! b. the structural scan over every event-group-shaped member
//! c. the observable-attributes shape, filtered to synced fields
//!
//! The first successful connection wins and its disconnector is returned.
//! A model exposing none of these shapes yields `None` without raising;
//! warning the user is the caller's responsibility.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::model::HostModel;
use crate::signals::ChangeListener;

/// Undoes one bridge connection when invoked.
pub type Disconnector = Box<dyn FnOnce() + Send>;

/// Wire `model`'s change notifier to `push`.
///
/// `push` is invoked with the changed field's name every time the notifier
/// fires. Returns the disconnector for the first notifier shape found, or
/// `None` when the model has no recognizable notifier.
#[must_use]
pub fn connect_change_bridge(model: &dyn HostModel, push: ChangeListener) -> Option<Disconnector> {
    // a. conventional accessor, b. structural scan fallback
    let group = model
        .event_group()
        .or_else(|| model.scan_event_groups().into_iter().next());
    if let Some(group) = group {
        debug!(model = model.type_label(), "bridging via event group");
        let id = group.connect(push);
        return Some(Box::new(move || {
            let _ = group.disconnect(id);
        }));
    }

    // c. observable-attributes shape, synced fields only
    if let Some(observable) = model.observable() {
        debug!(model = model.type_label(), "bridging via observable fields");
        let synced: HashSet<String> = observable.synced_fields().into_iter().collect();
        let signals = observable.signals();
        let filtered: ChangeListener = Arc::new(move |field: &str| {
            if synced.contains(field) {
                push(field);
            }
        });
        let id = signals.connect(filtered);
        return Some(Box::new(move || {
            let _ = signals.disconnect(id);
        }));
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObservableModel;
    use crate::signals::SignalGroup;
    use parking_lot::Mutex;
    use vitrine_core::{StateDict, StateError, StateValue};

    fn collector() -> (ChangeListener, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: ChangeListener = Arc::new(move |field: &str| sink.lock().push(field.to_string()));
        (listener, seen)
    }

    struct Bare;

    impl HostModel for Bare {
        fn type_label(&self) -> &str {
            "Bare"
        }
        fn assign(&mut self, _key: &str, _value: StateValue) -> Result<(), StateError> {
            Ok(())
        }
    }

    struct WithEvents {
        events: SignalGroup,
    }

    impl HostModel for WithEvents {
        fn type_label(&self) -> &str {
            "WithEvents"
        }
        fn assign(&mut self, _key: &str, _value: StateValue) -> Result<(), StateError> {
            Ok(())
        }
        fn event_group(&self) -> Option<SignalGroup> {
            Some(self.events.clone())
        }
    }

    struct UnconventionalEvents {
        hidden: SignalGroup,
    }

    impl HostModel for UnconventionalEvents {
        fn type_label(&self) -> &str {
            "UnconventionalEvents"
        }
        fn assign(&mut self, _key: &str, _value: StateValue) -> Result<(), StateError> {
            Ok(())
        }
        fn scan_event_groups(&self) -> Vec<SignalGroup> {
            vec![self.hidden.clone()]
        }
    }

    struct Observed {
        signals: SignalGroup,
    }

    impl HostModel for Observed {
        fn type_label(&self) -> &str {
            "Observed"
        }
        fn assign(&mut self, _key: &str, _value: StateValue) -> Result<(), StateError> {
            Ok(())
        }
        fn observable(&self) -> Option<&dyn ObservableModel> {
            Some(self)
        }
    }

    impl ObservableModel for Observed {
        fn synced_fields(&self) -> Vec<String> {
            vec!["synced".to_string()]
        }
        fn observable_state(
            &self,
            _include: Option<&HashSet<String>>,
        ) -> Result<StateDict, StateError> {
            Ok(StateDict::new())
        }
        fn signals(&self) -> SignalGroup {
            self.signals.clone()
        }
    }

    #[test]
    fn no_notifier_yields_none() {
        let (push, _) = collector();
        assert!(connect_change_bridge(&Bare, push).is_none());
    }

    #[test]
    fn event_group_bridges_and_disconnects() {
        let model = WithEvents {
            events: SignalGroup::new(),
        };
        let (push, seen) = collector();
        let disconnect = connect_change_bridge(&model, push).unwrap();

        model.events.emit("value");
        assert_eq!(*seen.lock(), vec!["value"]);

        disconnect();
        model.events.emit("value");
        assert_eq!(seen.lock().len(), 1, "disconnected bridge must not fire");
    }

    #[test]
    fn scan_fallback_finds_unconventional_groups() {
        let model = UnconventionalEvents {
            hidden: SignalGroup::new(),
        };
        let (push, seen) = collector();
        let _disconnect = connect_change_bridge(&model, push).unwrap();
        model.hidden.emit("x");
        assert_eq!(*seen.lock(), vec!["x"]);
    }

    #[test]
    fn observable_bridge_filters_to_synced_fields() {
        let model = Observed {
            signals: SignalGroup::new(),
        };
        let (push, seen) = collector();
        let _disconnect = connect_change_bridge(&model, push).unwrap();

        model.signals.emit("synced");
        model.signals.emit("private");
        assert_eq!(*seen.lock(), vec!["synced"]);
    }
}
