//! Service wiring for the HTTP layer.
//!
//! One `TransferEngine` per process. The store behind it is chosen from
//! configuration: SQLite when `DATABASE_URL` is set, otherwise in-memory.

use std::sync::Arc;

use anyhow::Context;

use peerpay_events::{InMemoryEventBus, LedgerUpdate};
use peerpay_infra::{
    InMemoryLedgerStore, LedgerStore, ServerConfig, SqliteLedgerStore, TransferEngine,
};
use peerpay_ledger::Account;

pub type SharedStore = Arc<dyn LedgerStore>;
pub type SharedBus = Arc<InMemoryEventBus<LedgerUpdate>>;
pub type Engine = TransferEngine<SharedStore, SharedBus>;

#[derive(Clone)]
pub struct AppServices {
    pub engine: Arc<Engine>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            engine: Arc::new(TransferEngine::new(store, Arc::new(InMemoryEventBus::new()))),
        }
    }

    /// In-memory wiring, used by tests and when no database is configured.
    pub fn in_memory(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self::new(Arc::new(InMemoryLedgerStore::new(accounts)))
    }
}

pub async fn build_services(config: &ServerConfig) -> anyhow::Result<AppServices> {
    let seed = config.seed()?;

    match &config.database_url {
        Some(url) => {
            let store = SqliteLedgerStore::connect(url, &seed)
                .await
                .with_context(|| format!("failed to open ledger database {url}"))?;
            tracing::info!("using sqlite ledger store");
            Ok(AppServices::new(Arc::new(store)))
        }
        None => {
            tracing::info!(accounts = seed.len(), "using in-memory ledger store");
            Ok(AppServices::in_memory(seed))
        }
    }
}
