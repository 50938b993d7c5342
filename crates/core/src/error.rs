//! Transfer error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used along the transfer path.
pub type TransferResult<T> = Result<T, TransferError>;

/// Outcome of a rejected or failed transfer.
///
/// The first five variants are validation failures: they are detected before
/// any mutation and leave the ledger untouched. `CommitFailure` means the
/// atomic apply itself failed and was rolled back. `CommunicationFailure` is
/// only produced on the client side when the engine could not be reached.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", content = "message", rename_all = "snake_case")]
pub enum TransferError {
    /// The sender id does not resolve to an account.
    #[error("invalid sender")]
    InvalidSender,

    /// The receiver id does not resolve to an account.
    #[error("invalid receiver")]
    InvalidReceiver,

    /// Sender and receiver are the same account.
    #[error("sender and receiver must be different accounts")]
    SameAccount,

    /// Amount is non-numeric, non-finite, or not strictly positive.
    #[error("invalid amount")]
    InvalidAmount,

    /// Sender balance is lower than the requested amount.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// The atomic apply failed after validation passed (rolled back).
    #[error("commit failed: {0}")]
    CommitFailure(String),

    /// The transfer engine could not be reached at all.
    #[error("communication failure: {0}")]
    CommunicationFailure(String),
}

impl TransferError {
    pub fn commit(msg: impl Into<String>) -> Self {
        Self::CommitFailure(msg.into())
    }

    pub fn communication(msg: impl Into<String>) -> Self {
        Self::CommunicationFailure(msg.into())
    }

    /// Stable wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidSender => "invalid_sender",
            TransferError::InvalidReceiver => "invalid_receiver",
            TransferError::SameAccount => "same_account",
            TransferError::InvalidAmount => "invalid_amount",
            TransferError::InsufficientBalance => "insufficient_balance",
            TransferError::CommitFailure(_) => "commit_failure",
            TransferError::CommunicationFailure(_) => "communication_failure",
        }
    }

    /// Rebuild an error from its wire code. Unknown codes map to a
    /// communication failure carrying the raw message.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        match code {
            "invalid_sender" => TransferError::InvalidSender,
            "invalid_receiver" => TransferError::InvalidReceiver,
            "same_account" => TransferError::SameAccount,
            "invalid_amount" => TransferError::InvalidAmount,
            "insufficient_balance" => TransferError::InsufficientBalance,
            "commit_failure" => TransferError::CommitFailure(message.into()),
            _ => TransferError::CommunicationFailure(message.into()),
        }
    }

    /// True for failures detected before any mutation.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            TransferError::CommitFailure(_) | TransferError::CommunicationFailure(_)
        )
    }

    /// True when the engine was unreachable (caller may retry or go offline).
    pub fn is_communication(&self) -> bool {
        matches!(self, TransferError::CommunicationFailure(_))
    }
}
