//! Ledger store implementations.
//!
//! - `trait.rs`: `LedgerStore` contract and its error type
//! - `in_memory.rs`: mutex-guarded book for tests/dev
//! - `sqlite.rs`: durable relational store over `sqlx`

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use sqlite::SqliteLedgerStore;
pub use r#trait::{LedgerStore, LedgerStoreError};
