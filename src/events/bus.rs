//! # Event bus for broadcasting streamer events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]; the tick loop and every
//! transition task publish into it without blocking.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Receivers:
//!   tick loop      ──┐
//!   load task  #1  ──┼──► Bus ──► fan-out listener ──► SubscriberSet
//!   unload task #2 ──┘   (ring)  └► Streamer::subscribe() callers
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped
//! - One shared ring buffer; slow receivers observe `RecvError::Lagged(n)`
//! - No persistence or replay

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for streamer events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus with the given ring capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes to every current receiver.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Receiver for events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn delivers_to_late_subscribers_only_new_events() {
        let bus = Bus::new(4);
        bus.publish(Event::new(EventKind::StreamerStarted));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::StreamerStopped));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::StreamerStopped);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = Bus::new(0);
        let _rx = bus.subscribe();
        bus.publish(Event::new(EventKind::TickCompleted));
    }
}
