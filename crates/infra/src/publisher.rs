//! State publisher: pushes full-replacement ledger state to observers.

use tokio::sync::Mutex;

use peerpay_events::{EventBus, LedgerUpdate, Subscription};
use peerpay_ledger::LedgerSnapshot;

use crate::ledger_store::{LedgerStore, LedgerStoreError};

/// Fans committed ledger state out to every connected observer.
///
/// Snapshot reads for `publish_latest` and `on_connect` go through one gate,
/// so observers see snapshots in the order they were read from the store and
/// a freshly connected observer can never be handed an account set older than
/// one that was already broadcast.
#[derive(Debug)]
pub struct StatePublisher<B> {
    bus: B,
    gate: Mutex<()>,
}

impl<B> StatePublisher<B>
where
    B: EventBus<LedgerUpdate>,
{
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            gate: Mutex::new(()),
        }
    }

    /// Send the account set and the recent-transfer window to every observer.
    ///
    /// Best-effort: returns the number of observers reached by the last
    /// message; unreachable observers are dropped, not retried.
    pub fn publish(&self, snapshot: &LedgerSnapshot) -> usize {
        let mut reached = 0;
        for update in LedgerUpdate::from_snapshot(snapshot) {
            let topic = update.topic();
            match self.bus.publish(update) {
                Ok(n) => reached = n,
                Err(e) => tracing::warn!(topic, error = ?e, "ledger update publish failed"),
            }
        }
        tracing::debug!(observers = reached, "published ledger snapshot");
        reached
    }

    /// Read the current snapshot from `store` and publish it.
    pub async fn publish_latest<S>(&self, store: &S) -> Result<usize, LedgerStoreError>
    where
        S: LedgerStore + ?Sized,
    {
        let _gate = self.gate.lock().await;
        let snapshot = store.snapshot().await?;
        Ok(self.publish(&snapshot))
    }

    /// Register a new observer. Its first message is the current account
    /// set; the transfer window only arrives with the next publish.
    pub async fn on_connect<S>(
        &self,
        store: &S,
    ) -> Result<Subscription<LedgerUpdate>, LedgerStoreError>
    where
        S: LedgerStore + ?Sized,
    {
        let _gate = self.gate.lock().await;
        let accounts = store.get_all_accounts().await?;
        let subscription = self.bus.subscribe_with(vec![LedgerUpdate::Accounts(accounts)]);
        tracing::debug!(observers = self.bus.subscriber_count(), "observer connected");
        Ok(subscription)
    }

    pub fn observer_count(&self) -> usize {
        self.bus.subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use peerpay_core::{AccountId, Money};
    use peerpay_events::InMemoryEventBus;
    use peerpay_ledger::{Account, TransferRequest, validate_transfer};

    use crate::ledger_store::InMemoryLedgerStore;

    fn store() -> InMemoryLedgerStore {
        InMemoryLedgerStore::new([
            Account::new(AccountId::new(1), "A", Money::from_major(1000.0).unwrap()),
            Account::new(AccountId::new(2), "B", Money::from_major(500.0).unwrap()),
        ])
    }

    #[tokio::test]
    async fn on_connect_greets_with_accounts_only() {
        let store = store();
        let publisher = StatePublisher::new(Arc::new(InMemoryEventBus::new()));

        let sub = publisher.on_connect(&store).await.unwrap();
        let messages = sub.drain();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            LedgerUpdate::Accounts(accounts) => assert_eq!(accounts.len(), 2),
            other => panic!("expected accounts greeting, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_observer_with_both_collections() {
        let store = store();
        let publisher = StatePublisher::new(Arc::new(InMemoryEventBus::new()));
        let a = publisher.on_connect(&store).await.unwrap();
        let b = publisher.on_connect(&store).await.unwrap();
        a.drain();
        b.drain();

        let accounts = store.get_all_accounts().await.unwrap();
        let v = validate_transfer(
            &accounts,
            &TransferRequest::new(AccountId::new(1), AccountId::new(2), 200.0),
        )
        .unwrap();
        store.apply_transfer_atomic(v).await.unwrap();

        assert_eq!(publisher.publish_latest(&store).await.unwrap(), 2);
        for sub in [a, b] {
            let topics: Vec<_> = sub.drain().iter().map(|u| u.topic()).collect();
            assert_eq!(topics, vec!["accounts", "transfers"]);
        }
    }

    #[tokio::test]
    async fn disconnected_observer_is_skipped() {
        let store = store();
        let publisher = StatePublisher::new(Arc::new(InMemoryEventBus::new()));
        drop(publisher.on_connect(&store).await.unwrap());
        assert_eq!(publisher.publish_latest(&store).await.unwrap(), 0);
        assert_eq!(publisher.observer_count(), 0);
    }
}
