//! EventEmitter - observable capability composed into host entities
//!
//! A thin wrapper around a tokio broadcast channel: emitting never blocks
//! and never fails, subscribers that fall behind see `Lagged`.

use tokio::sync::broadcast;

/// Broadcasts events of type `E` to every live subscriber
#[derive(Debug)]
pub struct EventEmitter<E> {
    tx: broadcast::Sender<E>,
}

impl<E: Clone> EventEmitter<E> {
    /// Create an emitter with the given broadcast channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Emit an event, returning how many subscribers it reached
    pub fn emit(&self, event: E) -> usize {
        // No receivers is not an error for an observable
        self.tx.send(event).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<E> Clone for EventEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_without_subscribers_reaches_nobody() {
        let emitter: EventEmitter<u32> = EventEmitter::new(8);
        assert_eq!(emitter.emit(1), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let emitter = EventEmitter::new(8);
        let mut rx = emitter.subscribe();

        assert_eq!(emitter.emit("a"), 1);
        emitter.emit("b");

        assert_eq!(rx.recv().await.unwrap(), "a");
        assert_eq!(rx.recv().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn clones_share_the_channel() {
        let emitter = EventEmitter::new(8);
        let clone = emitter.clone();
        let mut rx = emitter.subscribe();

        clone.emit(42);
        assert_eq!(rx.recv().await.unwrap(), 42);
        assert_eq!(clone.receiver_count(), 1);
    }
}
