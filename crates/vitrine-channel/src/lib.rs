//! # vitrine-channel
//!
//! The communication channel between a host model and its front-end view.
//!
//! - **[`Channel`]**: a bidirectional JSON-plus-buffers message pipe with an
//!   opaque id and exactly one inbound handler at a time
//! - **[`ChannelProvider`]**: opens channels; the embedding kernel supplies
//!   a real transport, tests and headless use get [`LoopbackChannel`]
//! - **[`ChannelRegistry`]**: the process-wide identity-keyed cache tying a
//!   channel's lifetime to its model's reachability

#![deny(unsafe_code)]

pub mod channel;
pub mod loopback;
pub mod registry;

pub use channel::{
    Channel, ChannelError, ChannelId, ChannelProvider, InboundMessage, MessageHandler,
};
pub use loopback::{LoopbackChannel, LoopbackProvider, SentMessage};
pub use registry::{ChannelRegistry, LivenessProbe, ModelKey, global_registry};
