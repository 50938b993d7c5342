//! Ledger domain: accounts, transfers, snapshots and the transfer rules.
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. The same
//! validation and apply code runs inside the server-side stores and inside
//! the offline client mirror.

pub mod book;
pub mod model;
pub mod rules;

pub use book::LedgerBook;
pub use model::{Account, LedgerSnapshot, RECENT_TRANSFER_LIMIT, Transfer, TransferRequest};
pub use rules::{AccountLookup, ValidatedTransfer, validate_transfer};
