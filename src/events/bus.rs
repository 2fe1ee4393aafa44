//! # Event bus for broadcasting watchdog events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources: the recovery driver,
//! the tunnel runner's output pumps, and the transport listener.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Subscriber (one):
//!   RecoveryDriver ──┐
//!   CommandRunner  ──┼───► Bus ────► forwarder (in Watchdog) ───► SubscriberSet
//!   LinkListener   ──┘ (broadcast)
//! ```
//!
//! The watchdog uses a single bus receiver (`Watchdog`'s forwarder task) that
//! fans events out to user subscribers via [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits. This is what
//!   lets the transport's activity context publish safely; that context must
//!   never block.
//! - **Bounded capacity**: a single ring buffer stores recent events for all
//!   receivers; slow receivers observe `RecvError::Lagged(n)` and skip `n`
//!   oldest items.
//! - **No persistence**: events published while no receiver exists are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for watchdog events.
///
/// Thin wrapper over [`tokio::sync::broadcast`] providing a `publish`/`subscribe`
/// API. Multiple publishers can publish concurrently; subscribers receive clones
/// of each event.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// Takes ownership of the event; the broadcast channel clones it for each
    /// receiver. If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// Each call creates an independent receiver; a receiver only gets events
    /// sent **after** it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(Event::new(EventKind::LinkUp).with_topic("a/#"));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::LinkUp);
        assert_eq!(ev.topic.as_deref(), Some("a/#"));
    }

    #[tokio::test]
    async fn test_publish_without_receiver_is_dropped() {
        let bus = Bus::new(8);
        // No receiver yet; must not block or panic.
        bus.publish(Event::new(EventKind::Stopped));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::LinkUp));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::LinkUp, "pre-subscribe event leaked");
    }

    #[test]
    fn test_zero_capacity_clamped() {
        // Must not panic: broadcast::channel(0) would.
        let _ = Bus::new(0);
    }
}
