//! Broker-availability lifecycle events.

use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// A broker-availability lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerEvent {
    Available,
    Unavailable,
}

/// Publishes `BrokerEvent`s tied to the system session's STOMP-connected
/// state. No deduplication: consumers must tolerate repeated events.
pub struct BrokerAvailabilityPublisher {
    tx: broadcast::Sender<BrokerEvent>,
}

impl BrokerAvailabilityPublisher {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BrokerEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: BrokerEvent) {
        debug!(?event, "publishing broker availability event");
        let _ = self.tx.send(event);
    }
}

impl Default for BrokerAvailabilityPublisher {
    fn default() -> Self {
        Self::new()
    }
}
