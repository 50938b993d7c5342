//! Client side of the ledger: a local mirror of server state that keeps
//! working while disconnected.
//!
//! - `mirror`: the dual-mode `ClientLedger`
//! - `gateway`: transfer submission and snapshot reads over HTTP
//! - `feed` / `sync_worker`: the live update stream and its reconnect loop

pub mod config;
pub mod feed;
pub mod gateway;
pub mod mirror;
pub mod offline;
pub mod sync_worker;

pub use config::ClientConfig;
pub use feed::{FeedMessage, SseDecoder, SseFrame};
pub use gateway::{HttpGateway, TransferGateway};
pub use mirror::{ClientLedger, TransferOutcome};
pub use offline::ConnectivityState;
pub use sync_worker::{FeedError, FeedWorker};
