//! Client configuration, read from the environment.
//!
//! | variable | default | meaning |
//! |----------|---------|---------|
//! | `PEERPAY_API_URL` | `http://localhost:8081` | ledger service base URL |
//! | `PEERPAY_REQUEST_TIMEOUT_MS` | `5000` | per-request timeout for transfers and reads |

use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_API_URL: &str = "http://localhost:8081";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_RECONNECT_INITIAL: Duration = Duration::from_secs(2);
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    /// First delay before reconnecting the live stream; doubles per failure.
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_initial: DEFAULT_RECONNECT_INITIAL,
            reconnect_max: DEFAULT_RECONNECT_MAX,
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("PEERPAY_API_URL").filter(|s| !s.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup("PEERPAY_REQUEST_TIMEOUT_MS") {
            let ms: u64 = raw
                .trim()
                .parse()
                .context("PEERPAY_REQUEST_TIMEOUT_MS must be a whole number of milliseconds")?;
            anyhow::ensure!(ms > 0, "PEERPAY_REQUEST_TIMEOUT_MS must be positive");
            config.request_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
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
    fn defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.url("/transfer"), "http://localhost:8081/transfer");
        assert_eq!(config.reconnect_initial, Duration::from_secs(2));
    }

    #[test]
    fn overrides_and_validation() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PEERPAY_API_URL", "http://ledger:9000/"),
            ("PEERPAY_REQUEST_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.url("/accounts"), "http://ledger:9000/accounts");
        assert_eq!(config.request_timeout, Duration::from_millis(250));

        for bad in ["soon", "0"] {
            let vars = [("PEERPAY_REQUEST_TIMEOUT_MS", bad)];
            assert!(ClientConfig::from_lookup(lookup(&vars)).is_err(), "{bad}");
        }
    }
}
