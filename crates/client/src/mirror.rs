//! Dual-mode client ledger.
//!
//! The client always keeps the latest server state it has been pushed. In
//! online mode that is also what it shows, and transfers are forwarded to
//! the engine without being applied locally: the result arrives later as a
//! push. In offline mode an overlay seeded from the server state is shown
//! instead, and transfers are validated and applied to the overlay only.
//! Going back online discards the overlay.

use chrono::Utc;

use peerpay_core::{AccountId, TransferError, TransferId, TransferResult};
use peerpay_events::LedgerUpdate;
use peerpay_ledger::{Account, LedgerBook, LedgerSnapshot, Transfer, TransferRequest};

use crate::gateway::TransferGateway;
use crate::offline::ConnectivityState;

pub const HANDLE_DOMAIN: &str = "peerpay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Accepted by the engine; the committed state arrives through the feed.
    Submitted,
    /// Applied to the offline overlay only.
    AppliedLocally(Transfer),
}

#[derive(Debug)]
pub struct ClientLedger<G> {
    gateway: G,
    server: LedgerSnapshot,
    overlay: Option<LedgerBook>,
    current_user: Option<AccountId>,
    client_id: Option<String>,
}

impl<G> ClientLedger<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            server: LedgerSnapshot::default(),
            overlay: None,
            current_user: None,
            client_id: None,
        }
    }

    /// Start from a known snapshot, e.g. one fetched over the gateway.
    pub fn with_snapshot(gateway: G, snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new(gateway);
        ledger.replace_snapshot(snapshot);
        ledger
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn mode(&self) -> ConnectivityState {
        if self.overlay.is_some() {
            ConnectivityState::Offline
        } else {
            ConnectivityState::Online
        }
    }

    pub fn is_offline(&self) -> bool {
        self.mode().is_offline()
    }

    /// Switch to offline mode. The overlay starts as a copy of the current
    /// server state. No-op when already offline.
    pub fn go_offline(&mut self) {
        if self.overlay.is_none() {
            self.overlay = Some(LedgerBook::from_snapshot(&self.server));
            tracing::info!("client ledger switched to offline mode");
        }
    }

    /// Switch to online mode, discarding every local-only transfer.
    pub fn go_online(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            let discarded = overlay
                .recent_transfers(overlay.transfer_count())
                .iter()
                .filter(|t| t.id.is_local())
                .count();
            tracing::info!(discarded, "client ledger switched to online mode");
            self.reconcile_selection();
        }
    }

    pub fn set_mode(&mut self, mode: ConnectivityState) {
        match mode {
            ConnectivityState::Online => self.go_online(),
            ConnectivityState::Offline => self.go_offline(),
        }
    }

    pub fn toggle_mode(&mut self) -> ConnectivityState {
        self.set_mode(self.mode().toggled());
        self.mode()
    }

    /// Apply a pushed update to the server copy. Applied in either mode;
    /// the offline overlay is left untouched.
    pub fn apply_update(&mut self, update: LedgerUpdate) {
        tracing::debug!(topic = update.topic(), "applying ledger update");
        update.apply_to(&mut self.server);
        self.reconcile_selection();
    }

    /// Replace the server copy wholesale (after a reconnect).
    pub fn replace_snapshot(&mut self, snapshot: LedgerSnapshot) {
        self.server = snapshot;
        self.reconcile_selection();
    }

    /// Latest known server state, regardless of mode.
    pub fn server_snapshot(&self) -> &LedgerSnapshot {
        &self.server
    }

    /// What this client currently shows.
    pub fn snapshot(&self) -> LedgerSnapshot {
        match &self.overlay {
            Some(book) => book.snapshot(),
            None => self.server.clone(),
        }
    }

    pub fn accounts(&self) -> Vec<Account> {
        match &self.overlay {
            Some(book) => book.accounts(),
            None => self.server.accounts.clone(),
        }
    }

    pub fn recent_transfers(&self) -> Vec<Transfer> {
        self.snapshot().recent_transfers
    }

    pub fn account(&self, id: AccountId) -> Option<Account> {
        match &self.overlay {
            Some(book) => book.account(id).cloned(),
            None => self.server.account(id).cloned(),
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn set_client_id(&mut self, id: impl Into<String>) {
        self.client_id = Some(id.into());
    }

    /// Choose the account transfers are sent from. Returns `false` (and keeps
    /// the previous selection) when the id is not a visible account.
    pub fn select_account(&mut self, id: AccountId) -> bool {
        if self.account(id).is_none() {
            return false;
        }
        self.current_user = Some(id);
        true
    }

    pub fn current_user(&self) -> Option<Account> {
        self.current_user.and_then(|id| self.account(id))
    }

    /// Payment handle of the current user, e.g. `sender@peerpay`.
    pub fn handle(&self) -> Option<String> {
        self.current_user()
            .map(|a| format!("{}@{}", a.name.to_lowercase(), HANDLE_DOMAIN))
    }

    // The selection falls back to the first account whenever it is unset
    // or no longer visible.
    fn reconcile_selection(&mut self) {
        let visible = self.current_user.is_some_and(|id| self.account(id).is_some());
        if !visible {
            self.current_user = self.accounts().first().map(|a| a.id);
        }
    }
}

impl<G> ClientLedger<G>
where
    G: TransferGateway,
{
    /// Transfer according to the current mode.
    pub async fn transfer(&mut self, request: TransferRequest) -> TransferResult<TransferOutcome> {
        match &mut self.overlay {
            Some(book) => {
                let transfer = book
                    .transfer(&request, TransferId::new_local(), Utc::now())
                    .inspect_err(|e| {
                        tracing::debug!(reason = e.code(), "offline transfer rejected")
                    })?;
                tracing::info!(
                    transfer_id = %transfer.id,
                    amount = %transfer.amount,
                    "offline transfer applied"
                );
                Ok(TransferOutcome::AppliedLocally(transfer))
            }
            None => {
                self.gateway.submit(&request).await.inspect_err(|e| {
                    if e.is_communication() {
                        tracing::warn!(error = %e, "transfer engine unreachable");
                    }
                })?;
                Ok(TransferOutcome::Submitted)
            }
        }
    }

    /// Send `amount` from the current user to `receiver`.
    pub async fn send(
        &mut self,
        receiver: AccountId,
        amount: f64,
    ) -> TransferResult<TransferOutcome> {
        let sender = self.current_user.ok_or(TransferError::InvalidSender)?;
        self.transfer(TransferRequest::new(sender, receiver, amount)).await
    }
}
