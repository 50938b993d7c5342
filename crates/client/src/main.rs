//! Headless client: mirrors the ledger and logs each change.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;

use peerpay_client::{ClientConfig, ClientLedger, FeedWorker, HttpGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    peerpay_observability::init();

    let config = ClientConfig::from_env()?;
    let gateway = HttpGateway::new(config.clone()).context("failed to build http client")?;
    let ledger = Arc::new(Mutex::new(ClientLedger::new(gateway)));

    let worker = FeedWorker::new(config, ledger.clone()).context("failed to build stream client")?;
    let shutdown = worker.shutdown_handle();
    let handle = worker.start();

    let watcher = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            let mut last = None;
            let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                tick.tick().await;
                let ledger = ledger.lock().await;
                let snapshot = ledger.snapshot();
                if last.as_ref() != Some(&snapshot) {
                    for account in &snapshot.accounts {
                        tracing::info!(
                            id = %account.id,
                            name = %account.name,
                            balance = %account.balance,
                            "account"
                        );
                    }
                    tracing::info!(
                        user = %ledger.handle().unwrap_or_default(),
                        transfers = snapshot.recent_transfers.len(),
                        "ledger state"
                    );
                    last = Some(snapshot);
                }
            }
        })
    };

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    watcher.abort();
    shutdown.notify_one();
    let _ = handle.await;
    Ok(())
}
