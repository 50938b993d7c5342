//! `peerpay-core`: shared building blocks for the payment ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the `Money` amount type and the transfer error
//! taxonomy shared by the server, the API boundary and the client mirror.

pub mod error;
pub mod id;
pub mod money;

pub use error::{TransferError, TransferResult};
pub use id::{AccountId, TransferId};
pub use money::Money;
