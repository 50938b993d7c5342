//! In-process fan-out bus.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    /// Subscriber list lock was poisoned by a panicking publisher.
    #[error("subscriber list lock poisoned")]
    Poisoned,
}

/// In-memory pub/sub bus backed by `std::sync::mpsc` channels.
///
/// - No IO; publishing never blocks on a slow subscriber
/// - Disconnected subscribers are pruned while publishing
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        let mut subs = self.subscribers.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        subs.retain(|tx| tx.send(message.clone()).is_ok());
        tracing::trace!(delivered = subs.len(), "bus publish");
        Ok(subs.len())
    }

    fn subscribe_with(&self, greeting: Vec<M>) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // Holding the lock while enqueueing keeps the greeting ahead of any
        // concurrent publish.
        match self.subscribers.lock() {
            Ok(mut subs) => {
                for message in greeting {
                    let _ = tx.send(message);
                }
                subs.push(tx);
            }
            Err(_) => tracing::error!("bus lock poisoned; subscriber will receive nothing"),
        }

        Subscription::new(rx)
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_every_message() {
        let bus = InMemoryEventBus::<u32>::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        assert_eq!(bus.publish(1).unwrap(), 2);
        assert_eq!(bus.publish(2).unwrap(), 2);

        assert_eq!(a.drain(), vec![1, 2]);
        assert_eq!(b.drain(), vec![1, 2]);
    }

    #[test]
    fn greeting_precedes_later_publishes() {
        let bus = InMemoryEventBus::<&'static str>::new();
        let sub = bus.subscribe_with(vec!["hello"]);
        bus.publish("update").unwrap();
        assert_eq!(sub.drain(), vec!["hello", "update"]);
    }

    #[test]
    fn dropped_subscribers_are_pruned_without_error() {
        let bus = InMemoryEventBus::<u32>::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish(7).unwrap(), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.drain(), vec![7]);
    }

    #[test]
    fn late_subscriber_misses_earlier_messages() {
        let bus = InMemoryEventBus::<u32>::new();
        bus.publish(1).unwrap();
        let late = bus.subscribe();
        assert!(late.drain().is_empty());
    }
}
