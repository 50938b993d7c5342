//! Connectivity mode of a client ledger.

use serde::{Deserialize, Serialize};

/// Whether transfers go to the server or are applied locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// Transfers are forwarded to the server; the view mirrors server state.
    #[default]
    Online,
    /// Transfers are applied to a private overlay only.
    Offline,
}

impl ConnectivityState {
    pub fn is_offline(&self) -> bool {
        *self == ConnectivityState::Offline
    }

    pub fn toggled(self) -> Self {
        match self {
            ConnectivityState::Online => ConnectivityState::Offline,
            ConnectivityState::Offline => ConnectivityState::Online,
        }
    }
}
