//! Strongly-typed identifiers used across the ledger.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an account (stable integer, assigned at seeding).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for AccountId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for AccountId {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Identifier of a transfer.
///
/// Two disjoint id spaces exist: `Committed` ids are sequential integers
/// handed out by the ledger store, `Local` ids are time-ordered UUIDs minted
/// by a client mirror while offline. On the wire a committed id is a JSON
/// integer and a local id is a string, so the two never collide.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransferId {
    Committed(i64),
    Local(Uuid),
}

impl TransferId {
    /// Mint a fresh local (offline) id.
    pub fn new_local() -> Self {
        Self::Local(Uuid::now_v7())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, TransferId::Local(_))
    }
}

impl core::fmt::Display for TransferId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransferId::Committed(n) => write!(f, "{n}"),
            TransferId::Local(uuid) => write!(f, "local-{uuid}"),
        }
    }
}
