//! State accessor resolution.
//!
//! Getter resolution probes the model's capabilities in a fixed priority
//! order, first match wins:
//!
//! 1. custom state accessor (escape hatch, used verbatim)
//! 2. structured record
//! 3. observable model (synced fields only)
//! 4. schema model
//! 5. compact struct
//!
//! No match is a configuration error surfaced at first use, never later.
//!
//! Setter resolution is simpler: the custom accessor when it handles
//! writes, else the default per-key assignment. The default never
//! validates; the model's own `assign` semantics are authoritative and any
//! rejection propagates to whoever applied the update.

use std::collections::HashSet;

use tracing::debug;

use vitrine_core::{StateDict, StateError, StateValue};

use crate::errors::ResolveError;
use crate::model::HostModel;

fn withdrawn(model: &dyn HostModel, capability: &str) -> StateError {
    StateError::InvalidShape(format!(
        "model `{}` stopped exposing its `{capability}` capability",
        model.type_label()
    ))
}

/// A resolved state-getting strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateGetter {
    /// [`crate::model::CustomStateAccess::state`].
    Custom,
    /// [`crate::model::RecordState::record_state`] (ignores `include`).
    Record,
    /// [`crate::model::ObservableModel::observable_state`].
    Observable,
    /// [`crate::model::SchemaModel::serialize_state`].
    Schema,
    /// [`crate::model::CompactStruct::to_plain`] (ignores `include`).
    Compact,
}

impl StateGetter {
    /// Pick the getter strategy for `model`.
    pub fn resolve(model: &dyn HostModel) -> Result<Self, ResolveError> {
        let getter = if model.custom_state().is_some() {
            Self::Custom
        } else if model.record().is_some() {
            Self::Record
        } else if model.observable().is_some() {
            Self::Observable
        } else if model.schema().is_some() {
            Self::Schema
        } else if model.compact().is_some() {
            Self::Compact
        } else {
            return Err(ResolveError::UnresolvableState {
                type_label: model.type_label().to_string(),
            });
        };
        debug!(model = model.type_label(), ?getter, "resolved state getter");
        Ok(getter)
    }

    /// Produce the model's state, optionally restricted to `include` keys.
    ///
    /// Strategies without native include support return their full state;
    /// callers filter afterwards.
    pub fn get(
        self,
        model: &dyn HostModel,
        include: Option<&HashSet<String>>,
    ) -> Result<StateDict, StateError> {
        match self {
            Self::Custom => model
                .custom_state()
                .ok_or_else(|| withdrawn(model, "custom state"))?
                .state(include),
            Self::Record => model
                .record()
                .ok_or_else(|| withdrawn(model, "record"))?
                .record_state(),
            Self::Observable => model
                .observable()
                .ok_or_else(|| withdrawn(model, "observable"))?
                .observable_state(include),
            Self::Schema => model
                .schema()
                .ok_or_else(|| withdrawn(model, "schema"))?
                .serialize_state(include),
            Self::Compact => {
                let plain = model
                    .compact()
                    .ok_or_else(|| withdrawn(model, "compact"))?
                    .to_plain()?;
                match plain {
                    StateValue::Object(dict) => Ok(dict),
                    other => Err(StateError::InvalidShape(format!(
                        "compact struct produced a non-object root: {other:?}"
                    ))),
                }
            }
        }
    }
}

/// A resolved state-setting strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateSetter {
    /// [`crate::model::CustomStateAccess::apply_state`].
    Custom,
    /// Per-key [`HostModel::assign`], intentionally permissive.
    Assign,
}

impl StateSetter {
    /// Pick the setter strategy for `model`.
    #[must_use]
    pub fn resolve(model: &dyn HostModel) -> Self {
        if model
            .custom_state()
            .is_some_and(|custom| custom.handles_set_state())
        {
            Self::Custom
        } else {
            Self::Assign
        }
    }

    /// Apply an inbound state dict to `model`.
    pub fn set(self, model: &mut dyn HostModel, state: StateDict) -> Result<(), StateError> {
        match self {
            Self::Custom => {
                let label = model.type_label().to_string();
                model
                    .custom_state_mut()
                    .ok_or_else(|| {
                        StateError::InvalidShape(format!(
                            "model `{label}` stopped exposing its `custom state` capability"
                        ))
                    })?
                    .apply_state(state)
            }
            Self::Assign => {
                for (key, value) in state {
                    model.assign(&key, value)?;
                }
                Ok(())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
