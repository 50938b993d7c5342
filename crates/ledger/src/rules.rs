//! Transfer validation rules.

use std::collections::BTreeMap;

use peerpay_core::{AccountId, Money, TransferError};

use crate::model::{Account, TransferRequest};

/// Read access to account balances, whatever holds them.
pub trait AccountLookup {
    fn balance_of(&self, id: AccountId) -> Option<Money>;
}

impl AccountLookup for [Account] {
    fn balance_of(&self, id: AccountId) -> Option<Money> {
        self.iter().find(|a| a.id == id).map(|a| a.balance)
    }
}

impl AccountLookup for Vec<Account> {
    fn balance_of(&self, id: AccountId) -> Option<Money> {
        self.as_slice().balance_of(id)
    }
}

impl AccountLookup for BTreeMap<AccountId, Account> {
    fn balance_of(&self, id: AccountId) -> Option<Money> {
        self.get(&id).map(|a| a.balance)
    }
}

/// A request that passed every check against some view of the accounts.
///
/// Only this type can be handed to an atomic apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedTransfer {
    sender_id: AccountId,
    receiver_id: AccountId,
    amount: Money,
}

impl ValidatedTransfer {
    pub fn sender_id(&self) -> AccountId {
        self.sender_id
    }

    pub fn receiver_id(&self) -> AccountId {
        self.receiver_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }
}

/// Validate a request. The first failing check wins:
///
/// 1. sender exists, receiver exists, and they differ
/// 2. amount is finite and strictly positive at cent resolution
/// 3. sender balance covers the amount
pub fn validate_transfer<L>(
    accounts: &L,
    req: &TransferRequest,
) -> Result<ValidatedTransfer, TransferError>
where
    L: AccountLookup + ?Sized,
{
    let sender_balance = accounts
        .balance_of(req.sender_id)
        .ok_or(TransferError::InvalidSender)?;
    if accounts.balance_of(req.receiver_id).is_none() {
        return Err(TransferError::InvalidReceiver);
    }
    if req.sender_id == req.receiver_id {
        return Err(TransferError::SameAccount);
    }

    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(TransferError::InvalidAmount);
    }
    // Finite but beyond any representable balance: no sender can cover it.
    let amount = Money::from_major(req.amount).ok_or(TransferError::InsufficientBalance)?;
    if amount.is_zero() {
        return Err(TransferError::InvalidAmount);
    }

    if sender_balance < amount {
        return Err(TransferError::InsufficientBalance);
    }

    Ok(ValidatedTransfer {
        sender_id: req.sender_id,
        receiver_id: req.receiver_id,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> Vec<Account> {
        vec![
            Account::new(AccountId::new(1), "A", Money::from_major(1000.0).unwrap()),
            Account::new(AccountId::new(2), "B", Money::from_major(500.0).unwrap()),
        ]
    }

    fn req(s: i64, r: i64, amount: f64) -> TransferRequest {
        TransferRequest::new(AccountId::new(s), AccountId::new(r), amount)
    }

    #[test]
    fn accepts_covered_transfer() {
        let v = validate_transfer(&accounts(), &req(1, 2, 200.0)).unwrap();
        assert_eq!(v.amount(), Money::from_major(200.0).unwrap());
        assert_eq!(v.sender_id(), AccountId::new(1));
    }

    #[test]
    fn sender_checked_before_receiver_and_amount() {
        assert_eq!(
            validate_transfer(&accounts(), &req(9, 8, f64::NAN)),
            Err(TransferError::InvalidSender)
        );
        assert_eq!(
            validate_transfer(&accounts(), &req(1, 8, -5.0)),
            Err(TransferError::InvalidReceiver)
        );
    }

    #[test]
    fn rejects_self_transfer() {
        assert_eq!(
            validate_transfer(&accounts(), &req(1, 1, 10.0)),
            Err(TransferError::SameAccount)
        );
    }

    #[test]
    fn rejects_unusable_amounts() {
        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY, 0.001] {
            assert_eq!(
                validate_transfer(&accounts(), &req(1, 2, amount)),
                Err(TransferError::InvalidAmount),
                "amount {amount}"
            );
        }
    }

    #[test]
    fn amount_checked_before_balance() {
        assert_eq!(
            validate_transfer(&accounts(), &req(2, 1, -2000.0)),
            Err(TransferError::InvalidAmount)
        );
        assert_eq!(
            validate_transfer(&accounts(), &req(1, 2, 2000.0)),
            Err(TransferError::InsufficientBalance)
        );
    }

    #[test]
    fn amounts_beyond_any_balance_are_insufficient_not_invalid() {
        for amount in [1e17, 1e300, f64::MAX] {
            assert_eq!(
                validate_transfer(&accounts(), &req(1, 2, amount)),
                Err(TransferError::InsufficientBalance),
                "amount {amount}"
            );
        }
    }

    #[test]
    fn exact_balance_is_allowed() {
        assert!(validate_transfer(&accounts(), &req(2, 1, 500.0)).is_ok());
    }
}
