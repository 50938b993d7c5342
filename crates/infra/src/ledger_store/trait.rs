use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use peerpay_core::{AccountId, TransferError};
use peerpay_ledger::{Account, LedgerSnapshot, RECENT_TRANSFER_LIMIT, Transfer, ValidatedTransfer};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerStoreError {
    /// A check re-run inside the store's critical section failed. Nothing
    /// was written.
    #[error("transfer rejected: {0}")]
    Rejected(TransferError),

    /// The storage backend failed. Any partial work was rolled back.
    #[error("storage failure: {0}")]
    Backend(String),
}

impl LedgerStoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<LedgerStoreError> for TransferError {
    fn from(value: LedgerStoreError) -> Self {
        match value {
            LedgerStoreError::Rejected(e) => e,
            LedgerStoreError::Backend(msg) => TransferError::CommitFailure(msg),
        }
    }
}

/// Authoritative storage for accounts and the append-only transfer log.
///
/// ## Atomicity
///
/// `apply_transfer_atomic` debits the sender, credits the receiver and
/// appends the transfer as one unit: all three become visible together or
/// none do. Implementations serialize applies, and re-check account
/// existence and sender balance inside that serialized section, so two
/// transfers touching the same account can never both act on the same
/// balance read.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerStoreError>;

    /// All accounts ordered by id.
    async fn get_all_accounts(&self) -> Result<Vec<Account>, LedgerStoreError>;

    async fn apply_transfer_atomic(
        &self,
        transfer: ValidatedTransfer,
    ) -> Result<Transfer, LedgerStoreError>;

    /// Up to `limit` transfers, newest first.
    async fn get_recent_transfers(&self, limit: usize) -> Result<Vec<Transfer>, LedgerStoreError>;

    async fn snapshot(&self) -> Result<LedgerSnapshot, LedgerStoreError> {
        let accounts = self.get_all_accounts().await?;
        let transfers = self.get_recent_transfers(RECENT_TRANSFER_LIMIT).await?;
        Ok(LedgerSnapshot::new(accounts, transfers))
    }
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, LedgerStoreError> {
        (**self).get_account(id).await
    }

    async fn get_all_accounts(&self) -> Result<Vec<Account>, LedgerStoreError> {
        (**self).get_all_accounts().await
    }

    async fn apply_transfer_atomic(
        &self,
        transfer: ValidatedTransfer,
    ) -> Result<Transfer, LedgerStoreError> {
        (**self).apply_transfer_atomic(transfer).await
    }

    async fn get_recent_transfers(&self, limit: usize) -> Result<Vec<Transfer>, LedgerStoreError> {
        (**self).get_recent_transfers(limit).await
    }

    async fn snapshot(&self) -> Result<LedgerSnapshot, LedgerStoreError> {
        (**self).snapshot().await
    }
}
