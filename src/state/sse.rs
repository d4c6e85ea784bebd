use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Events buffered per subscriber before it starts lagging.
pub const HUB_CAPACITY: usize = 16;

/// Broadcast hub wrapper fanning one user's events out to their SSE streams.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of connected subscribers.
    pub fn subscribers(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SseHub {
    fn default() -> Self {
        Self::new(HUB_CAPACITY)
    }
}
