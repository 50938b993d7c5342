//! Server configuration, read from the environment.
//!
//! | variable | default | meaning |
//! |----------|---------|---------|
//! | `PEERPAY_BIND_ADDR` | `0.0.0.0:8081` | HTTP listen address |
//! | `DATABASE_URL` | unset | `sqlite:` URL; unset selects the in-memory store |
//! | `PEERPAY_SEED_ACCOUNTS` | Sender/Receiver | JSON array of `{id, name, balance}` |

use anyhow::Context;
use serde::Deserialize;

use peerpay_core::{AccountId, Money};
use peerpay_ledger::Account;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";

/// One account created when the store starts empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedAccount {
    pub id: i64,
    pub name: String,
    /// Opening balance in major units.
    pub balance: f64,
}

impl SeedAccount {
    pub fn to_account(&self) -> anyhow::Result<Account> {
        let balance = Money::from_major(self.balance)
            .with_context(|| format!("invalid opening balance for account {}", self.id))?;
        Ok(Account::new(AccountId::new(self.id), self.name.clone(), balance))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub seed_accounts: Vec<SeedAccount>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            seed_accounts: default_seed(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr =
            lookup("PEERPAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        if database_url.is_none() {
            tracing::warn!(
                "DATABASE_URL not set; using in-memory ledger store (state is lost on restart)"
            );
        }

        let seed_accounts = match lookup("PEERPAY_SEED_ACCOUNTS") {
            Some(raw) => serde_json::from_str(&raw)
                .context("PEERPAY_SEED_ACCOUNTS must be a JSON array")?,
            None => default_seed(),
        };

        let config = Self {
            bind_addr,
            database_url,
            seed_accounts,
        };
        config.seed()?;
        Ok(config)
    }

    /// Seed accounts as domain values.
    pub fn seed(&self) -> anyhow::Result<Vec<Account>> {
        let accounts = self
            .seed_accounts
            .iter()
            .map(SeedAccount::to_account)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut ids: Vec<_> = accounts.iter().map(|a| a.id).collect();
        ids.sort();
        ids.dedup();
        anyhow::ensure!(ids.len() == accounts.len(), "seed account ids must be unique");
        Ok(accounts)
    }
}

fn default_seed() -> Vec<SeedAccount> {
    vec![
        SeedAccount {
            id: 1,
            name: "Sender".to_string(),
            balance: 1000.0,
        },
        SeedAccount {
            id: 2,
            name: "Receiver".to_string(),
            balance: 500.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        let seed = config.seed().unwrap();
        assert_eq!(seed[0].name, "Sender");
        assert_eq!(seed[1].balance, Money::from_major(500.0).unwrap());
    }

    #[test]
    fn reads_database_url_and_seed() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://ledger.db"),
            ("PEERPAY_SEED_ACCOUNTS", r#"[{"id": 7, "name": "Ada", "balance": 12.5}]"#),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite://ledger.db"));
        assert_eq!(config.seed().unwrap()[0].id, AccountId::new(7));
    }

    #[test]
    fn rejects_duplicate_or_negative_seed() {
        assert!(ServerConfig::from_lookup(lookup(&[(
            "PEERPAY_SEED_ACCOUNTS",
            r#"[{"id": 1, "name": "a", "balance": 1}, {"id": 1, "name": "b", "balance": 1}]"#,
        )]))
        .is_err());
        assert!(ServerConfig::from_lookup(lookup(&[(
            "PEERPAY_SEED_ACCOUNTS",
            r#"[{"id": 1, "name": "a", "balance": -1}]"#,
        )]))
        .is_err());
    }
}
