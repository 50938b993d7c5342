use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use peerpay_core::{AccountId, Money, TransferId};

/// Number of transfers surfaced to observers.
pub const RECENT_TRANSFER_LIMIT: usize = 10;

/// A named holder of a non-negative balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub balance: Money,
}

impl Account {
    pub fn new(id: AccountId, name: impl Into<String>, balance: Money) -> Self {
        Self {
            id,
            name: name.into(),
            balance,
        }
    }
}

/// Immutable record of a committed movement of funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: TransferId,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
}

/// Transfer intent as issued by a caller, before validation.
///
/// `amount` stays a raw float so that an unusable amount is reported only
/// after the account ids have been checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: f64,
}

impl TransferRequest {
    pub fn new(sender_id: AccountId, receiver_id: AccountId, amount: f64) -> Self {
        Self {
            sender_id,
            receiver_id,
            amount,
        }
    }
}

/// Full account set plus the most recent transfers, newest first.
///
/// Derived on demand; never stored on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub accounts: Vec<Account>,
    pub recent_transfers: Vec<Transfer>,
}

impl LedgerSnapshot {
    /// Normalize into snapshot order: accounts by id, transfers newest first
    /// (ties broken by descending id), capped at `RECENT_TRANSFER_LIMIT`.
    pub fn new(mut accounts: Vec<Account>, mut transfers: Vec<Transfer>) -> Self {
        accounts.sort_by_key(|a| a.id);
        sort_newest_first(&mut transfers);
        transfers.truncate(RECENT_TRANSFER_LIMIT);
        Self {
            accounts,
            recent_transfers: transfers,
        }
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Sum of all balances, in minor units.
    pub fn total_balance(&self) -> i128 {
        self.accounts.iter().map(|a| a.balance.minor() as i128).sum()
    }
}

/// Sort transfers by commit time, newest first.
pub fn sort_newest_first(transfers: &mut [Transfer]) {
    transfers.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| tiebreak(&b.id).cmp(&tiebreak(&a.id)))
    });
}

fn tiebreak(id: &TransferId) -> (u8, i64, u128) {
    match id {
        TransferId::Committed(n) => (0, *n, 0),
        TransferId::Local(uuid) => (1, 0, uuid.as_u128()),
    }
}
