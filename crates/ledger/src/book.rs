//! In-memory ledger book: accounts plus an append-only transfer log.
//!
//! Used as the state of the in-memory store and as the offline overlay of a
//! client mirror. `commit` is all-or-nothing: every check and every balance
//! computation happens before the first write.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use peerpay_core::{AccountId, Money, TransferError, TransferId};

use crate::model::{Account, LedgerSnapshot, Transfer, TransferRequest};
use crate::rules::{ValidatedTransfer, validate_transfer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerBook {
    accounts: BTreeMap<AccountId, Account>,
    /// Newest first.
    transfers: Vec<Transfer>,
}

impl LedgerBook {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
            transfers: Vec::new(),
        }
    }

    /// Seed a book from a snapshot (accounts and the visible transfer window).
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Self {
        Self {
            accounts: snapshot.accounts.iter().map(|a| (a.id, a.clone())).collect(),
            transfers: snapshot.recent_transfers.clone(),
        }
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// All accounts ordered by id.
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.values().cloned().collect()
    }

    /// Up to `limit` transfers, newest first.
    pub fn recent_transfers(&self, limit: usize) -> Vec<Transfer> {
        self.transfers.iter().take(limit).cloned().collect()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::new(self.accounts(), self.recent_transfers(crate::RECENT_TRANSFER_LIMIT))
    }

    /// Sum of all balances, in minor units.
    pub fn total_balance(&self) -> i128 {
        self.accounts.values().map(|a| a.balance.minor() as i128).sum()
    }

    pub fn validate(&self, req: &TransferRequest) -> Result<ValidatedTransfer, TransferError> {
        validate_transfer(&self.accounts, req)
    }

    /// Apply a validated transfer under the given id.
    ///
    /// The checks are repeated against the current state, so a transfer
    /// validated against an older view can never overdraw an account.
    pub fn commit(
        &mut self,
        transfer: ValidatedTransfer,
        id: TransferId,
        now: DateTime<Utc>,
    ) -> Result<Transfer, TransferError> {
        let sender = self
            .accounts
            .get(&transfer.sender_id())
            .ok_or(TransferError::InvalidSender)?;
        let receiver = self
            .accounts
            .get(&transfer.receiver_id())
            .ok_or(TransferError::InvalidReceiver)?;
        if sender.id == receiver.id {
            return Err(TransferError::SameAccount);
        }

        let new_sender = sender
            .balance
            .checked_sub(transfer.amount())
            .ok_or(TransferError::InsufficientBalance)?;
        let new_receiver = receiver
            .balance
            .checked_add(transfer.amount())
            .ok_or_else(|| TransferError::commit("receiver balance overflow"))?;

        let record = Transfer {
            id,
            sender_id: transfer.sender_id(),
            receiver_id: transfer.receiver_id(),
            amount: transfer.amount(),
            timestamp: self.next_commit_time(now),
        };

        self.set_balance(transfer.sender_id(), new_sender);
        self.set_balance(transfer.receiver_id(), new_receiver);
        self.transfers.insert(0, record.clone());
        Ok(record)
    }

    /// Validate and commit in one step.
    pub fn transfer(
        &mut self,
        req: &TransferRequest,
        id: TransferId,
        now: DateTime<Utc>,
    ) -> Result<Transfer, TransferError> {
        let validated = self.validate(req)?;
        self.commit(validated, id, now)
    }

    /// Commit timestamps are strictly increasing within a book.
    fn next_commit_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.transfers.first() {
            Some(last) if now <= last.timestamp => last.timestamp + Duration::microseconds(1),
            _ => now,
        }
    }

    fn set_balance(&mut self, id: AccountId, balance: Money) {
        if let Some(account) = self.accounts.get_mut(&id) {
            account.balance = balance;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn money(major: f64) -> Money {
        Money::from_major(major).unwrap()
    }

    fn book() -> LedgerBook {
        LedgerBook::new([
            Account::new(AccountId::new(1), "A", money(1000.0)),
            Account::new(AccountId::new(2), "B", money(500.0)),
        ])
    }

    fn req(s: i64, r: i64, amount: f64) -> TransferRequest {
        TransferRequest::new(AccountId::new(s), AccountId::new(r), amount)
    }

    #[test]
    fn transfer_moves_funds_and_records_it() {
        let mut b = book();
        let t = b
            .transfer(&req(1, 2, 200.0), TransferId::Committed(1), Utc::now())
            .unwrap();

        assert_eq!(b.account(AccountId::new(1)).unwrap().balance, money(800.0));
        assert_eq!(b.account(AccountId::new(2)).unwrap().balance, money(700.0));
        assert_eq!(b.recent_transfers(10), vec![t]);
    }

    #[test]
    fn failed_transfer_leaves_book_unchanged() {
        let mut b = book();
        let before = b.clone();
        let err = b
            .transfer(&req(1, 2, 2000.0), TransferId::Committed(1), Utc::now())
            .unwrap_err();
        assert_eq!(err, TransferError::InsufficientBalance);
        assert_eq!(b, before);
    }

    #[test]
    fn stale_validation_is_caught_at_commit() {
        let mut b = book();
        let first = b.validate(&req(2, 1, 400.0)).unwrap();
        let second = b.validate(&req(2, 1, 400.0)).unwrap();

        b.commit(first, TransferId::Committed(1), Utc::now()).unwrap();
        let before = b.clone();
        assert_eq!(
            b.commit(second, TransferId::Committed(2), Utc::now()),
            Err(TransferError::InsufficientBalance)
        );
        assert_eq!(b, before);
    }

    #[test]
    fn commit_times_strictly_increase_even_with_a_stuck_clock() {
        let mut b = book();
        let now = Utc::now();
        let t1 = b.transfer(&req(1, 2, 1.0), TransferId::Committed(1), now).unwrap();
        let t2 = b.transfer(&req(1, 2, 1.0), TransferId::Committed(2), now).unwrap();
        assert!(t2.timestamp > t1.timestamp);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever mix of accepted and rejected transfers is
        /// attempted, total balance is conserved and no balance is negative.
        /// Rejected attempts leave the book exactly as it was.
        #[test]
        fn conservation_and_atomicity(
            ops in prop::collection::vec((1i64..=4, 1i64..=4, -100.0f64..1500.0), 1..40)
        ) {
            let mut b = book();
            let total = b.total_balance();
            let mut next_id = 1;

            for (s, r, amount) in ops {
                let before = b.clone();
                match b.transfer(&req(s, r, amount), TransferId::Committed(next_id), Utc::now()) {
                    Ok(_) => next_id += 1,
                    Err(_) => prop_assert_eq!(&b, &before),
                }
                prop_assert_eq!(b.total_balance(), total);
                prop_assert!(b.accounts().iter().all(|a| a.balance >= Money::ZERO));
            }

            prop_assert_eq!(b.transfer_count() as i64, next_id - 1);
        }
    }
}
