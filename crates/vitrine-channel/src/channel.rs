//! The channel trait and its wire-facing types.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Opaque channel identifier, shared with the front end so a display
/// bundle can point at the channel backing it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// Generate a fresh id (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inbound message: JSON body plus out-of-band binary payloads.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// The JSON message body.
    pub data: Value,
    /// Binary payloads, positionally aligned with the body's buffer paths.
    pub buffers: Vec<Bytes>,
}

/// Handler invoked for each inbound message.
pub type MessageHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel has been closed; sends are rejected.
    #[error("channel is closed")]
    Closed,

    /// The transport failed to open a channel.
    #[error("failed to open channel: {0}")]
    Open(String),

    /// The transport failed to deliver a message.
    #[error("failed to send on channel: {0}")]
    Send(String),
}

/// A bidirectional message pipe to one front-end peer.
///
/// Delivery is best-effort and fire-and-forget: `send` hands the message to
/// the transport and returns; there is no resend or acknowledgement.
pub trait Channel: Send + Sync {
    /// The channel's opaque id.
    fn id(&self) -> &ChannelId;

    /// Send a JSON body with out-of-band buffers.
    fn send(&self, data: Value, buffers: Vec<Bytes>) -> Result<(), ChannelError>;

    /// Install (or with `None`, remove) the inbound handler. A channel has
    /// at most one handler; installing replaces the previous one.
    fn set_handler(&self, handler: Option<MessageHandler>);

    /// Close the channel. Idempotent.
    fn close(&self);

    /// `true` once the channel has been closed.
    fn is_closed(&self) -> bool;
}

/// Opens channels toward the front end.
pub trait ChannelProvider: Send + Sync {
    /// Open a channel for `target`, seeding the handshake `metadata` and
    /// initial `data` payloads.
    fn open(&self, target: &str, metadata: Value, data: Value)
    -> Result<Arc<dyn Channel>, ChannelError>;
}
