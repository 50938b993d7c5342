//! Transfer execution pipeline.
//!
//! ```text
//! TransferRequest
//!   ↓
//! 1. Resolve sender + receiver from the store
//!   ↓
//! 2. Validate (pure rules: ids, amount, balance)
//!   ↓
//! 3. Atomic apply in the store (checks re-run inside its critical section)
//!   ↓
//! 4. Publish the new snapshot to observers (after commit, best-effort)
//! ```
//!
//! Validation failures return before step 3 and never touch the store.
//! Publication failures are logged and do not turn a committed transfer into
//! an error: the commit is durable and the next publish replaces everything.

use tracing::instrument;

use peerpay_core::{TransferError, TransferResult};
use peerpay_events::{EventBus, LedgerUpdate, Subscription};
use peerpay_ledger::{LedgerSnapshot, Transfer, TransferRequest, validate_transfer};

use crate::ledger_store::{LedgerStore, LedgerStoreError};
use crate::publisher::StatePublisher;

#[derive(Debug)]
pub struct TransferEngine<S, B> {
    store: S,
    publisher: StatePublisher<B>,
}

impl<S, B> TransferEngine<S, B> {
    pub fn new(store: S, bus: B) -> Self
    where
        B: EventBus<LedgerUpdate>,
    {
        Self {
            store,
            publisher: StatePublisher::new(bus),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &StatePublisher<B> {
        &self.publisher
    }
}

impl<S, B> TransferEngine<S, B>
where
    S: LedgerStore,
    B: EventBus<LedgerUpdate>,
{
    /// Validate and commit one transfer, then broadcast the new state.
    #[instrument(
        skip(self, request),
        fields(
            sender_id = %request.sender_id,
            receiver_id = %request.receiver_id,
            amount = request.amount
        )
    )]
    pub async fn transfer(&self, request: TransferRequest) -> TransferResult<Transfer> {
        let sender = self.store.get_account(request.sender_id).await?;
        let receiver = self.store.get_account(request.receiver_id).await?;
        let known: Vec<_> = sender.into_iter().chain(receiver).collect();

        let validated = validate_transfer(&known, &request).inspect_err(|e| {
            tracing::debug!(reason = e.code(), "transfer rejected");
        })?;

        let committed = self
            .store
            .apply_transfer_atomic(validated)
            .await
            .map_err(TransferError::from)
            .inspect_err(|e| match e {
                TransferError::CommitFailure(msg) => {
                    tracing::error!(error = %msg, "transfer commit failed")
                }
                other => tracing::debug!(reason = other.code(), "transfer rejected at commit"),
            })?;

        tracing::info!(
            transfer_id = %committed.id,
            amount = %committed.amount,
            "transfer committed"
        );

        if let Err(e) = self.publisher.publish_latest(&self.store).await {
            tracing::warn!(error = %e, "snapshot publish after commit failed");
        }

        Ok(committed)
    }

    /// Current accounts plus the recent-transfer window.
    pub async fn snapshot(&self) -> Result<LedgerSnapshot, LedgerStoreError> {
        self.store.snapshot().await
    }

    /// Register an observer; see `StatePublisher::on_connect`.
    pub async fn on_connect(&self) -> Result<Subscription<LedgerUpdate>, LedgerStoreError> {
        self.publisher.on_connect(&self.store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use peerpay_core::{AccountId, Money, TransferId};
    use peerpay_events::InMemoryEventBus;
    use peerpay_ledger::Account;
    use proptest::prelude::*;

    use crate::ledger_store::{InMemoryLedgerStore, SqliteLedgerStore};

    type MemEngine = TransferEngine<Arc<InMemoryLedgerStore>, Arc<InMemoryEventBus<LedgerUpdate>>>;

    const A: AccountId = AccountId::new(1);
    const B: AccountId = AccountId::new(2);

    fn money(major: f64) -> Money {
        Money::from_major(major).unwrap()
    }

    fn seed() -> Vec<Account> {
        vec![Account::new(A, "A", money(1000.0)), Account::new(B, "B", money(500.0))]
    }

    fn engine() -> MemEngine {
        TransferEngine::new(
            Arc::new(InMemoryLedgerStore::new(seed())),
            Arc::new(InMemoryEventBus::new()),
        )
    }

    async fn balance<S: LedgerStore, Bus: EventBus<LedgerUpdate>>(
        engine: &TransferEngine<S, Bus>,
        id: AccountId,
    ) -> Money {
        engine.store().get_account(id).await.unwrap().unwrap().balance
    }

    #[tokio::test]
    async fn online_transfer_commits_and_broadcasts() {
        let engine = engine();
        let observer = engine.on_connect().await.unwrap();
        observer.drain();

        let t = engine.transfer(TransferRequest::new(A, B, 200.0)).await.unwrap();
        assert_eq!(t.id, TransferId::Committed(1));
        assert_eq!(balance(&engine, A).await, money(800.0));
        assert_eq!(balance(&engine, B).await, money(700.0));

        let pushed = observer.drain();
        assert_eq!(pushed.len(), 2);
        match &pushed[0] {
            LedgerUpdate::Accounts(accounts) => {
                assert_eq!(accounts[0].balance, money(800.0));
                assert_eq!(accounts[1].balance, money(700.0));
            }
            other => panic!("expected accounts push, got {other:?}"),
        }
        match &pushed[1] {
            LedgerUpdate::Transfers(transfers) => assert_eq!(transfers, &vec![t]),
            other => panic!("expected transfers push, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn insufficient_balance_changes_nothing_and_publishes_nothing() {
        let engine = engine();
        let observer = engine.on_connect().await.unwrap();
        observer.drain();
        let before = engine.snapshot().await.unwrap();

        let err = engine.transfer(TransferRequest::new(A, B, 2000.0)).await.unwrap_err();
        assert_eq!(err, TransferError::InsufficientBalance);
        assert_eq!(engine.snapshot().await.unwrap(), before);
        assert!(observer.drain().is_empty());
    }

    #[tokio::test]
    async fn validation_order_is_sender_receiver_amount_balance() {
        let engine = engine();
        let unknown = AccountId::new(99);
        let cases = [
            (TransferRequest::new(unknown, unknown, f64::NAN), TransferError::InvalidSender),
            (TransferRequest::new(A, unknown, -1.0), TransferError::InvalidReceiver),
            (TransferRequest::new(A, A, 1.0), TransferError::SameAccount),
            (TransferRequest::new(A, B, 0.0), TransferError::InvalidAmount),
            (TransferRequest::new(B, A, 500.01), TransferError::InsufficientBalance),
        ];
        for (req, expected) in cases {
            assert_eq!(engine.transfer(req).await.unwrap_err(), expected);
        }
        assert_eq!(engine.store().transfer_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn opposite_concurrent_transfers_settle_consistently() {
        let engine = Arc::new(engine());

        let e1 = engine.clone();
        let e2 = engine.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { e1.transfer(TransferRequest::new(A, B, 300.0)).await }),
            tokio::spawn(async move { e2.transfer(TransferRequest::new(B, A, 100.0)).await }),
        );
        r1.unwrap().unwrap();
        r2.unwrap().unwrap();

        assert_eq!(balance(&engine, A).await, money(800.0));
        assert_eq!(balance(&engine, B).await, money(700.0));
        assert_eq!(engine.store().transfer_count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn contended_transfers_never_overdraw() {
        let engine = Arc::new(engine());

        // 20 × 100 out of B's 500: exactly five can succeed.
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let e = engine.clone();
                tokio::spawn(async move { e.transfer(TransferRequest::new(B, A, 100.0)).await })
            })
            .collect();

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert_eq!(e, TransferError::InsufficientBalance),
            }
        }

        assert_eq!(ok, 5);
        assert_eq!(balance(&engine, B).await, Money::ZERO);
        assert_eq!(engine.store().total_balance().await, money(1500.0).minor() as i128);
    }

    #[tokio::test]
    async fn sqlite_engine_surfaces_commit_failure() {
        let store = SqliteLedgerStore::connect("sqlite::memory:", &seed()).await.unwrap();
        sqlx::query("DROP TABLE transfers").execute(store.pool()).await.unwrap();
        let engine = TransferEngine::new(store, Arc::new(InMemoryEventBus::<LedgerUpdate>::new()));

        let err = engine.transfer(TransferRequest::new(A, B, 10.0)).await.unwrap_err();
        assert!(matches!(err, TransferError::CommitFailure(_)));
        assert_eq!(balance(&engine, A).await, money(1000.0));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: conservation and non-negativity hold through the whole
        /// engine + store pipeline, and the visible window never exceeds ten
        /// entries.
        #[test]
        fn pipeline_conserves_total_balance(
            ops in prop::collection::vec((1i64..=3, 1i64..=3, -50.0f64..800.0), 1..30)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let engine = engine();
                let total = engine.store().total_balance().await;
                for (s, r, amount) in ops {
                    let req = TransferRequest::new(AccountId::new(s), AccountId::new(r), amount);
                    let _ = engine.transfer(req).await;
                    let snap = engine.snapshot().await.unwrap();
                    assert_eq!(snap.total_balance(), total);
                    assert!(snap.recent_transfers.len() <= 10);
                }
            });
        }
    }
}
