//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]; publishing never blocks.
//!
//! ```text
//!   Plugin 1 ──┐
//!   Plugin N ──┼──────► Bus ───────► subscriber listener ────► SubscriberSet
//!   Manager  ──┘  (broadcast chan)     (in PluginManager)
//! ```
//!
//! ## Rules
//! - Bounded ring buffer shared by all receivers; laggards observe `RecvError::Lagged(n)`.
//! - Events sent while nobody is subscribed are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver observing events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn delivers_to_existing_receivers_only() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ShutdownRequested));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::AllStopped));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::AllStopped);
    }
}
