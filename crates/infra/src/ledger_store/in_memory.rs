use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use peerpay_core::{AccountId, TransferId};
use peerpay_ledger::{Account, LedgerBook, Transfer, ValidatedTransfer};

use super::r#trait::{LedgerStore, LedgerStoreError};

#[derive(Debug)]
struct MemoryState {
    book: LedgerBook,
    next_id: i64,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A single async mutex serializes every apply
/// against every other, which is the simplest discipline that keeps
/// overlapping transfers totally ordered.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    state: Mutex<MemoryState>,
}

impl InMemoryLedgerStore {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                book: LedgerBook::new(accounts),
                next_id: 1,
            }),
        }
    }

    /// Total balance across all accounts, in minor units.
    pub async fn total_balance(&self) -> i128 {
        self.state.lock().await.book.total_balance()
    }

    pub async fn transfer_count(&self) -> usize {
        self.state.lock().await.book.transfer_count()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerStoreError> {
        Ok(self.state.lock().await.book.account(id).cloned())
    }

    async fn get_all_accounts(&self) -> Result<Vec<Account>, LedgerStoreError> {
        Ok(self.state.lock().await.book.accounts())
    }

    async fn apply_transfer_atomic(
        &self,
        transfer: ValidatedTransfer,
    ) -> Result<Transfer, LedgerStoreError> {
        let mut state = self.state.lock().await;
        let id = TransferId::Committed(state.next_id);
        let committed = state
            .book
            .commit(transfer, id, Utc::now())
            .map_err(LedgerStoreError::Rejected)?;
        state.next_id += 1;
        Ok(committed)
    }

    async fn get_recent_transfers(&self, limit: usize) -> Result<Vec<Transfer>, LedgerStoreError> {
        Ok(self.state.lock().await.book.recent_transfers(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerpay_core::{Money, TransferError};
    use peerpay_ledger::{TransferRequest, validate_transfer};

    fn store() -> InMemoryLedgerStore {
        InMemoryLedgerStore::new([
            Account::new(AccountId::new(1), "A", Money::from_major(1000.0).unwrap()),
            Account::new(AccountId::new(2), "B", Money::from_major(500.0).unwrap()),
        ])
    }

    async fn validated(
        store: &InMemoryLedgerStore,
        s: i64,
        r: i64,
        amount: f64,
    ) -> ValidatedTransfer {
        let accounts = store.get_all_accounts().await.unwrap();
        let req = TransferRequest::new(AccountId::new(s), AccountId::new(r), amount);
        validate_transfer(&accounts, &req).unwrap()
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let store = store();
        let v = validated(&store, 1, 2, 1.0).await;
        let t1 = store.apply_transfer_atomic(v).await.unwrap();
        let t2 = store.apply_transfer_atomic(v).await.unwrap();
        assert_eq!(t1.id, TransferId::Committed(1));
        assert_eq!(t2.id, TransferId::Committed(2));
    }

    #[tokio::test]
    async fn rejected_apply_does_not_consume_an_id() {
        let store = store();
        let all = validated(&store, 2, 1, 500.0).await;
        store.apply_transfer_atomic(all).await.unwrap();

        let err = store.apply_transfer_atomic(all).await.unwrap_err();
        assert_eq!(err, LedgerStoreError::Rejected(TransferError::InsufficientBalance));

        let next = store.apply_transfer_atomic(validated(&store, 1, 2, 1.0).await).await.unwrap();
        assert_eq!(next.id, TransferId::Committed(2));
    }

    #[tokio::test]
    async fn recent_transfers_newest_first() {
        let store = store();
        for _ in 0..12 {
            let v = validated(&store, 1, 2, 1.0).await;
            store.apply_transfer_atomic(v).await.unwrap();
        }
        let recent = store.get_recent_transfers(10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].id, TransferId::Committed(12));
        assert!(recent.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }
}
