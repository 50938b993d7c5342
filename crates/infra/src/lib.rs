//! Infrastructure layer: ledger stores, the transfer pipeline, state
//! publishing and server configuration.

pub mod config;
pub mod ledger_store;
pub mod publisher;
pub mod transfer_engine;

pub use config::{SeedAccount, ServerConfig};
pub use ledger_store::{InMemoryLedgerStore, LedgerStore, LedgerStoreError, SqliteLedgerStore};
pub use publisher::StatePublisher;
pub use transfer_engine::TransferEngine;
