//! The facade's error type.

use thiserror::Error;
use vitrine_assets::AssetError;
use vitrine_channel::ChannelError;
use vitrine_core::{ProtocolError, StateError};
use vitrine_host::ResolveError;

/// Any failure surfaced through a [`ViewBundle`](crate::ViewBundle) API.
#[derive(Debug, Error)]
pub enum BundleError {
    /// State conversion, splitting, joining, or application failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// An inbound message violated the wire protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The model exposes no usable state accessor.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The channel refused to open or send.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A hoisted asset could not be read or watched.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// The weakly-held model has been dropped.
    #[error("the model behind this bundle has been dropped")]
    ModelDropped,
}
