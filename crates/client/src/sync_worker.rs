//! Background worker that keeps a `ClientLedger` fed from the server's
//! live stream.
//!
//! Each session connects to `/stream`, re-reads the full snapshot (anything
//! pushed while disconnected was missed), then applies pushes as they
//! arrive. When the stream drops, the worker waits and reconnects, doubling
//! the wait after each failure up to the configured cap.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, Notify};

use peerpay_core::TransferError;

use crate::config::ClientConfig;
use crate::feed::{FeedMessage, SseDecoder};
use crate::gateway::{HttpGateway, TransferGateway};
use crate::mirror::ClientLedger;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("stream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("snapshot resync failed: {0}")]
    Resync(TransferError),
}

pub struct FeedWorker<G> {
    config: ClientConfig,
    stream_client: reqwest::Client,
    gateway: HttpGateway,
    ledger: Arc<Mutex<ClientLedger<G>>>,
    shutdown: Arc<Notify>,
}

impl<G> FeedWorker<G>
where
    G: Send + 'static,
{
    pub fn new(config: ClientConfig, ledger: Arc<Mutex<ClientLedger<G>>>) -> reqwest::Result<Self> {
        // The stream stays open indefinitely, so only connecting is bounded.
        let stream_client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        let gateway = HttpGateway::new(config.clone())?;
        Ok(Self {
            config,
            stream_client,
            gateway,
            ledger,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Handle for stopping the worker after `start`.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Request graceful shutdown of the worker.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Spawn the reconnect loop.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(api_url = %self.config.api_url, "ledger feed worker started");

            let mut delay = self.config.reconnect_initial;

            loop {
                let session = tokio::select! {
                    _ = self.shutdown.notified() => None,
                    result = self.run_session(&mut delay) => Some(result),
                };
                match session {
                    None => break,
                    Some(Ok(())) => tracing::info!("ledger stream closed by server"),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, retry_in = ?delay, "ledger stream failed")
                    }
                }

                tokio::select! {
                    _ = self.shutdown.notified() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = next_delay(delay, self.config.reconnect_max);
                tracing::warn!("reconnecting to ledger stream");
            }

            tracing::info!("ledger feed worker stopped");
        })
    }

    /// One connection: resync, then apply pushes until the stream ends.
    async fn run_session(&self, delay: &mut Duration) -> Result<(), FeedError> {
        let mut resp = self
            .stream_client
            .get(self.config.url("/stream"))
            .send()
            .await?
            .error_for_status()?;

        let snapshot = self.gateway.fetch_snapshot().await.map_err(FeedError::Resync)?;
        self.ledger.lock().await.replace_snapshot(snapshot);
        *delay = self.config.reconnect_initial;
        tracing::info!("ledger stream connected");

        let mut decoder = SseDecoder::new();
        while let Some(chunk) = resp.chunk().await? {
            for frame in decoder.push(&chunk) {
                match FeedMessage::from_frame(&frame) {
                    Ok(Some(FeedMessage::ClientId(id))) => {
                        tracing::debug!(client_id = %id, "stream assigned client id");
                        self.ledger.lock().await.set_client_id(id);
                    }
                    Ok(Some(FeedMessage::Update(update))) => {
                        self.ledger.lock().await.apply_update(update);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "undecodable stream message"),
                }
            }
        }
        Ok(())
    }
}

fn next_delay(current: Duration, max: Duration) -> Duration {
    std::cmp::min(current.saturating_mul(2), max)
}
