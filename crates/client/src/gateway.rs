//! Path from a client to the transfer engine.

use async_trait::async_trait;
use serde::Deserialize;

use peerpay_core::{TransferError, TransferResult};
use peerpay_ledger::{Account, LedgerSnapshot, Transfer, TransferRequest};

use crate::config::ClientConfig;

/// Submits transfers to the engine and reads authoritative state.
///
/// Any failure to reach the engine (connection refused, timeout, an
/// unreadable response) is reported as `TransferError::CommunicationFailure`
/// so callers can tell it apart from a rejected transfer.
#[async_trait]
pub trait TransferGateway: Send + Sync {
    async fn submit(&self, request: &TransferRequest) -> TransferResult<()>;

    async fn fetch_snapshot(&self) -> TransferResult<LedgerSnapshot>;
}

#[async_trait]
impl<G> TransferGateway for std::sync::Arc<G>
where
    G: TransferGateway + ?Sized,
{
    async fn submit(&self, request: &TransferRequest) -> TransferResult<()> {
        (**self).submit(request).await
    }

    async fn fetch_snapshot(&self) -> TransferResult<LedgerSnapshot> {
        (**self).fetch_snapshot().await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: String,
}

/// `TransferGateway` over the ledger service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpGateway {
    pub fn new(config: ClientConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get_json<T>(&self, path: &str) -> TransferResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .client
            .get(self.config.url(path))
            .send()
            .await
            .map_err(communication)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        resp.json().await.map_err(communication)
    }
}

#[async_trait]
impl TransferGateway for HttpGateway {
    async fn submit(&self, request: &TransferRequest) -> TransferResult<()> {
        let resp = self
            .client
            .post(self.config.url("/transfer"))
            .json(request)
            .send()
            .await
            .map_err(communication)?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(resp).await)
        }
    }

    async fn fetch_snapshot(&self) -> TransferResult<LedgerSnapshot> {
        let accounts: Vec<Account> = self.get_json("/accounts").await?;
        let transfers: Vec<Transfer> = self.get_json("/transfers/recent").await?;
        Ok(LedgerSnapshot::new(accounts, transfers))
    }
}

fn communication(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        TransferError::communication("request timed out")
    } else {
        TransferError::communication(err.to_string())
    }
}

/// Rebuild the engine's error from a `{"error", "message"}` body.
async fn error_from_response(resp: reqwest::Response) -> TransferError {
    let status = resp.status();
    match resp.json::<ErrorBody>().await {
        Ok(body) => {
            let message = if body.message.is_empty() {
                body.error.clone()
            } else {
                body.message
            };
            TransferError::from_code(&body.error, message)
        }
        Err(_) => TransferError::communication(format!("unexpected response status {status}")),
    }
}
