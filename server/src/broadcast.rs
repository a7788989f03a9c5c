//! Fan-out of outbound events to all connected clients.

use tandem_types::events::OutboundEvent;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts serialized response events to every connected WebSocket
/// client, matching the wire protocol's broadcast emission.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<String>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Send an event to all connected clients.
    pub fn broadcast(&self, event: &OutboundEvent) {
        match serde_json::to_string(event) {
            Ok(json) => {
                // No subscribers is fine
                let _ = self.tx.send(json);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outbound event");
            }
        }
    }

    /// Subscribe to all broadcast events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}
