//! Pub/sub channel shared with the door controllers
//!
//! Delivery is at-least-once and every subscriber, the publisher included,
//! sees every message. Receivers must therefore drop their own broadcasts.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::error::BusResult;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Message channel transport
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Publish one JSON message to every subscriber
    async fn publish(&self, message: Value) -> BusResult<()>;

    /// Start receiving messages published from now on
    fn subscribe(&self) -> ChannelSubscription;
}

/// Receiving end of a channel
pub struct ChannelSubscription {
    channel: String,
    receiver: broadcast::Receiver<Value>,
}

impl ChannelSubscription {
    pub fn new(channel: impl Into<String>, receiver: broadcast::Receiver<Value>) -> Self {
        Self {
            channel: channel.into(),
            receiver,
        }
    }

    /// Next message; `None` once the channel is gone
    ///
    /// A subscriber that falls behind skips what it missed and keeps going.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.channel, skipped, "Subscriber lagged, messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// In-process channel over a tokio broadcast
pub struct LocalChannel {
    name: String,
    sender: broadcast::Sender<Value>,
    published: AtomicU64,
}

impl LocalChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            sender,
            published: AtomicU64::new(0),
        }
    }

    /// Messages published since creation
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl MessageChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, message: Value) -> BusResult<()> {
        self.published.fetch_add(1, Ordering::SeqCst);
        // No subscriber is not an error: nobody is listening yet
        if self.sender.send(message).is_err() {
            tracing::debug!(channel = %self.name, "Published with no subscribers");
        }
        Ok(())
    }

    fn subscribe(&self) -> ChannelSubscription {
        ChannelSubscription::new(self.name.clone(), self.sender.subscribe())
    }
}
