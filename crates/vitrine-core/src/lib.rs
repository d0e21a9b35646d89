//! # vitrine-core
//!
//! Foundation types for the vitrine state-synchronization protocol.
//!
//! This crate provides the shared vocabulary the other vitrine crates build on:
//!
//! - **State values**: [`StateValue`] — a JSON tree that may carry raw binary
//!   leaves — and [`StateDict`], the ordered key/value map mirrored to a view
//! - **Buffer splitting**: [`split_buffers`] / [`join_buffers`] — move binary
//!   payloads out of (and back into) a state tree so the JSON part stays
//!   wire-safe while buffers travel out-of-band
//! - **Wire protocol**: [`WireMessage`] plus the handshake constants the
//!   front end expects (`jupyter.widget` target, protocol version 2.1.0)
//! - **Errors**: [`StateError`] and [`ProtocolError`] via `thiserror`

#![deny(unsafe_code)]

pub mod buffers;
pub mod errors;
pub mod path;
pub mod state;
pub mod wire;

pub use buffers::{join_buffers, split_buffers};
pub use errors::{ProtocolError, StateError};
pub use path::{BufferPath, PathSegment};
pub use state::{StateDict, StateValue};
pub use wire::{
    FRONTEND_MODULE, MODEL_NAME, PROTOCOL_VERSION, PROTOCOL_VERSION_MAJOR, PROTOCOL_VERSION_MINOR,
    TARGET_NAME, VIEW_NAME, WIDGET_MIME_TYPE, WireMessage, handshake_data, handshake_metadata,
};
