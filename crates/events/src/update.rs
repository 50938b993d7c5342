//! Messages pushed to observers after a commit.

use serde::{Deserialize, Serialize};

use peerpay_ledger::{Account, LedgerSnapshot, Transfer};

/// Full-replacement push of one ledger collection.
///
/// Serialized as `{"type": "accounts", "data": [...]}` so observers can
/// dispatch on the topic without knowing the payload shape up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LedgerUpdate {
    /// The complete account set, ordered by id.
    Accounts(Vec<Account>),
    /// The recent-transfer window, newest first.
    Transfers(Vec<Transfer>),
}

impl LedgerUpdate {
    pub fn topic(&self) -> &'static str {
        match self {
            LedgerUpdate::Accounts(_) => "accounts",
            LedgerUpdate::Transfers(_) => "transfers",
        }
    }

    /// The pair of messages that publishes a whole snapshot.
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> [LedgerUpdate; 2] {
        [
            LedgerUpdate::Accounts(snapshot.accounts.clone()),
            LedgerUpdate::Transfers(snapshot.recent_transfers.clone()),
        ]
    }

    /// Replace the matching collection of `snapshot` with this update.
    pub fn apply_to(self, snapshot: &mut LedgerSnapshot) {
        match self {
            LedgerUpdate::Accounts(accounts) => {
                let transfers = std::mem::take(&mut snapshot.recent_transfers);
                *snapshot = LedgerSnapshot::new(accounts, transfers);
            }
            LedgerUpdate::Transfers(transfers) => {
                *snapshot = LedgerSnapshot::new(std::mem::take(&mut snapshot.accounts), transfers);
            }
        }
    }
}
