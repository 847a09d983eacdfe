//! Live-subscriber stream for dashboards
//!
//! Producers never wait on consumers: a subscriber that falls more than
//! `capacity` events behind loses the oldest ones.

use hostlock_core::LiveEvent;
use serde_json::Value;
use tokio::sync::broadcast;

pub const DEFAULT_LIVE_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct LiveStream {
    sender: broadcast::Sender<String>,
}

impl LiveStream {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Push an already serialized payload
    pub fn push(&self, payload: String) {
        // Err only means nobody is watching
        let _ = self.sender.send(payload);
    }

    pub fn push_event(&self, event: &LiveEvent) {
        self.push(event.to_json());
    }

    /// Raw copy of an inbound channel message
    pub fn push_raw(&self, message: &Value) {
        self.push(message.to_string());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveStream {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_CAPACITY)
    }
}
