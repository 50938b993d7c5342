//! Publish/subscribe abstraction for ledger state pushes.
//!
//! The bus only distributes; it never stores. The ledger store is the source
//! of truth, and every message on the bus is a full replacement of some
//! collection, so a subscriber that misses a message recovers on the next one.
//!
//! Delivery is best-effort and fire-and-forget: a subscriber that has gone
//! away is silently dropped at the next publish, and nothing is queued or
//! retried on its behalf.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// One observer's view of the bus.
///
/// Each subscription receives its own copy of every message published after
/// it was created, in publish order. Dropping the subscription disconnects
/// the observer.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Fan-out bus used by the state publisher.
///
/// ```text
/// commit → StatePublisher::publish → EventBus → Subscription (per observer)
/// ```
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Send `message` to every live subscriber. Returns how many were reached.
    fn publish(&self, message: M) -> Result<usize, Self::Error>;

    /// Register a subscriber whose queue starts with `greeting`.
    ///
    /// The greeting is enqueued and the subscriber registered as one step, so
    /// no publish can be observed before the greeting.
    fn subscribe_with(&self, greeting: Vec<M>) -> Subscription<M>;

    fn subscribe(&self) -> Subscription<M> {
        self.subscribe_with(Vec::new())
    }

    /// Number of currently registered subscribers (dead ones included until
    /// the next publish prunes them).
    fn subscriber_count(&self) -> usize;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        (**self).publish(message)
    }

    fn subscribe_with(&self, greeting: Vec<M>) -> Subscription<M> {
        (**self).subscribe_with(greeting)
    }

    fn subscriber_count(&self) -> usize {
        (**self).subscriber_count()
    }
}
