//! # vitrine-host
//!
//! How vitrine talks to arbitrary host models.
//!
//! The original duck-typed probing ("does this object look like an evented
//! dataclass? a traits model? a schema model?") becomes an ordered list of
//! named capabilities here: a model implements [`HostModel`] and opts into
//! whichever capability traits describe it. The resolver and the change
//! bridge probe those capabilities in a fixed priority order, so every
//! supported shape is enumerable and independently testable.
//!
//! - **[`HostModel`]** and the capability traits in [`model`]
//! - **[`SignalGroup`]**: the change-event primitive models emit through
//! - **[`StateGetter`] / [`StateSetter`]**: resolved accessor strategies
//! - **[`connect_change_bridge`]**: wires a model's notifier to state pushes

#![deny(unsafe_code)]

pub mod bridge;
pub mod errors;
pub mod model;
pub mod resolve;
pub mod signals;

pub use bridge::{Disconnector, connect_change_bridge};
pub use errors::ResolveError;
pub use model::{
    CompactStruct, CustomStateAccess, HostModel, ModelHandle, ObservableModel, RecordState,
    SchemaModel, SharedModel, record_state_of,
};
pub use resolve::{StateGetter, StateSetter};
pub use signals::{ChangeListener, ListenerId, SignalGroup};
