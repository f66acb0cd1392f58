//! Transaction states and the events emitted when a transaction moves between them.

use std::fmt;

use alloy_primitives::B256;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{trace, warn};

use crate::error::SafeError;

const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Created,
    Prepared,
    Finalizing,
    Proposed,
    Submitted,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Confirmed | TransactionStatus::Failed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            TransactionStatus::Created => "created",
            TransactionStatus::Prepared => "prepared",
            TransactionStatus::Finalizing => "finalizing",
            TransactionStatus::Proposed => "proposed",
            TransactionStatus::Submitted => "submitted",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Prepared,
    Proposed,
    Submitted,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    pub tx_id: String,
    pub kind: EventKind,
    pub safe_tx_hash: Option<B256>,
    /// Hash of the on-chain transaction, once one was dispatched.
    pub chain_tx_hash: Option<B256>,
    pub error: Option<SafeError>,
}

impl TransactionEvent {
    pub fn new(tx_id: impl Into<String>, kind: EventKind) -> Self {
        Self { tx_id: tx_id.into(), kind, safe_tx_hash: None, chain_tx_hash: None, error: None }
    }

    pub fn with_safe_tx_hash(self, safe_tx_hash: B256) -> Self {
        Self { safe_tx_hash: Some(safe_tx_hash), ..self }
    }

    pub fn with_chain_tx_hash(self, chain_tx_hash: Option<B256>) -> Self {
        Self { chain_tx_hash, ..self }
    }

    pub fn with_error(self, error: SafeError) -> Self {
        Self { error: Some(error), ..self }
    }
}

/// Fan-out of lifecycle events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TransactionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: TransactionEvent) {
        trace!(tx_id = %event.tx_id, kind = ?event.kind, "Emitting transaction event");
        // No subscribers is fine, the event is simply not observed.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription { receiver: self.sender.subscribe() }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A scoped subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<TransactionEvent>,
}

impl Subscription {
    /// Waits for the next event. Returns `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<TransactionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged behind, events were dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next already-emitted event without waiting.
    pub fn try_next(&mut self) -> Option<TransactionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged behind, events were dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(TransactionStatus::Confirmed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(!TransactionStatus::Submitted.is_terminal());
        assert_eq!(TransactionStatus::Finalizing.to_string(), "finalizing");
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::default();
        let mut subscription = bus.subscribe();

        bus.emit(TransactionEvent::new("tx", EventKind::Prepared));
        bus.emit(TransactionEvent::new("tx", EventKind::Submitted));

        assert_eq!(subscription.next().await.unwrap().kind, EventKind::Prepared);
        assert_eq!(subscription.next().await.unwrap().kind, EventKind::Submitted);
        assert_eq!(subscription.try_next(), None);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus = EventBus::default();
        let subscription = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);

        bus.emit(TransactionEvent::new("tx", EventKind::Failed));
    }

    #[test]
    fn lagging_subscriber_skips_to_newest() {
        let bus = EventBus::new(1);
        let mut subscription = bus.subscribe();

        bus.emit(TransactionEvent::new("tx", EventKind::Prepared));
        bus.emit(TransactionEvent::new("tx", EventKind::Proposed));

        assert_eq!(subscription.try_next().unwrap().kind, EventKind::Proposed);
    }

    #[tokio::test]
    async fn closed_bus_ends_subscription() {
        let bus = EventBus::default();
        let mut subscription = bus.subscribe();
        drop(bus);

        assert_eq!(subscription.next().await, None);
    }
}
