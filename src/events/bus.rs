//! # Lifecycle event bus.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] used by the
//! middleware and the epic runner to publish lifecycle [`Event`]s.
//!
//! ```text
//! Publishers:                         Consumers:
//!   EpicMiddleware ──┐
//!   epic runner    ──┼──► Bus ──► subscriber listener ──► SubscriberSet
//!   SubscriberSet  ──┘         └─► EpicMiddleware::events() receivers
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - Bounded ring buffer shared by all receivers; slow receivers observe
//!   `RecvError::Lagged(n)`.
//! - Events published while nobody listens are dropped.
//!
//! The bus only carries observability data. Actions travel through the
//! lossless action channel, never through the bus.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_only_later_events() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::EpicStarted).with_epic("early"));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::EpicCompleted).with_epic("late"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::EpicCompleted);
        assert_eq!(ev.epic.as_deref(), Some("late"));
        assert!(rx.try_recv().is_err());
    }
}
