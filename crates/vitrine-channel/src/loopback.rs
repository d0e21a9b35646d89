//! In-memory loopback channel.
//!
//! Stands in for a real kernel transport: outbound messages are recorded
//! for inspection and inbound messages are injected directly into the
//! installed handler. Headless hosts and the test suite both run on it.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::channel::{
    Channel, ChannelError, ChannelId, ChannelProvider, InboundMessage, MessageHandler,
};

/// One recorded outbound message.
#[derive(Clone, Debug)]
pub struct SentMessage {
    /// The JSON body that was sent.
    pub data: Value,
    /// The buffers sent alongside.
    pub buffers: Vec<Bytes>,
}

/// An in-memory [`Channel`].
pub struct LoopbackChannel {
    id: ChannelId,
    target: String,
    metadata: Value,
    open_data: Value,
    sent: Mutex<Vec<SentMessage>>,
    handler: Mutex<Option<MessageHandler>>,
    closed: Mutex<bool>,
}

impl LoopbackChannel {
    /// Create an open channel, recording the handshake payloads.
    #[must_use]
    pub fn new(target: &str, metadata: Value, open_data: Value) -> Self {
        Self {
            id: ChannelId::new(),
            target: target.to_string(),
            metadata,
            open_data,
            sent: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
            closed: Mutex::new(false),
        }
    }

    /// The target name the channel was opened with.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The handshake metadata the channel was opened with.
    #[must_use]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// The initial data payload the channel was opened with.
    #[must_use]
    pub fn open_data(&self) -> &Value {
        &self.open_data
    }

    /// Snapshot of every message sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Number of messages sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Deliver an inbound message to the installed handler, if any.
    ///
    /// The handler runs on the calling thread, outside the channel's own
    /// locks, so it is free to send on this channel re-entrantly.
    pub fn inject(&self, data: Value, buffers: Vec<Bytes>) {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(InboundMessage { data, buffers }),
            None => debug!(channel = %self.id, "inbound message dropped: no handler"),
        }
    }
}

impl Channel for LoopbackChannel {
    fn id(&self) -> &ChannelId {
        &self.id
    }

    fn send(&self, data: Value, buffers: Vec<Bytes>) -> Result<(), ChannelError> {
        if *self.closed.lock() {
            return Err(ChannelError::Closed);
        }
        self.sent.lock().push(SentMessage { data, buffers });
        Ok(())
    }

    fn set_handler(&self, handler: Option<MessageHandler>) {
        *self.handler.lock() = handler;
    }

    fn close(&self) {
        let mut closed = self.closed.lock();
        if !*closed {
            *closed = true;
            *self.handler.lock() = None;
            debug!(channel = %self.id, "channel closed");
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

/// Provider handing out [`LoopbackChannel`]s and remembering each one for
/// later inspection.
#[derive(Default)]
pub struct LoopbackProvider {
    opened: Mutex<Vec<Arc<LoopbackChannel>>>,
}

impl LoopbackProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every channel opened through this provider, in open order.
    #[must_use]
    pub fn opened(&self) -> Vec<Arc<LoopbackChannel>> {
        self.opened.lock().clone()
    }
}

impl ChannelProvider for LoopbackProvider {
    fn open(
        &self,
        target: &str,
        metadata: Value,
        data: Value,
    ) -> Result<Arc<dyn Channel>, ChannelError> {
        let channel = Arc::new(LoopbackChannel::new(target, metadata, data));
        self.opened.lock().push(Arc::clone(&channel));
        debug!(channel = %channel.id(), target, "opened loopback channel");
        Ok(channel)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
