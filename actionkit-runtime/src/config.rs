//! Runtime configuration read from environment variables.

use std::time::Duration;

use thiserror::Error;

use crate::types::Network;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

pub const DEFAULT_NETWORK_ID: &str = "base-sepolia";
pub const DEFAULT_PROTOCOL_FAMILY: &str = "evm";
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 2_000;

/// Connection and wallet settings for an alloy-backed wallet.
#[derive(Clone)]
pub struct RuntimeConfig {
    pub rpc_url: String,
    pub private_key: String,
    pub network: Network,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("network", &self.network)
            .field("receipt_timeout", &self.receipt_timeout)
            .field("receipt_poll_interval", &self.receipt_poll_interval)
            .finish()
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Every missing required key is
    /// reported in one [`ConfigError::Missing`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rpc_url = get("RPC_URL");
        let private_key = get("PRIVATE_KEY");
        let missing: Vec<String> = [("RPC_URL", &rpc_url), ("PRIVATE_KEY", &private_key)]
            .into_iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.to_string())
            .collect();
        let (Some(rpc_url), Some(private_key)) = (rpc_url, private_key) else {
            return Err(ConfigError::Missing(missing));
        };

        url::Url::parse(&rpc_url).map_err(|e| ConfigError::Invalid {
            key: "RPC_URL".into(),
            message: e.to_string(),
        })?;

        let network_id = get("NETWORK_ID").unwrap_or_else(|| {
            tracing::warn!("NETWORK_ID not set, defaulting to {DEFAULT_NETWORK_ID}");
            DEFAULT_NETWORK_ID.to_string()
        });
        let protocol_family =
            get("PROTOCOL_FAMILY").unwrap_or_else(|| DEFAULT_PROTOCOL_FAMILY.to_string());

        let receipt_timeout_secs = parse_u64(
            get("RECEIPT_TIMEOUT_SECS"),
            "RECEIPT_TIMEOUT_SECS",
            DEFAULT_RECEIPT_TIMEOUT_SECS,
        )?;
        let poll_ms = parse_u64(
            get("RECEIPT_POLL_INTERVAL_MS"),
            "RECEIPT_POLL_INTERVAL_MS",
            DEFAULT_RECEIPT_POLL_INTERVAL_MS,
        )?;
        if poll_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "RECEIPT_POLL_INTERVAL_MS".into(),
                message: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            rpc_url,
            private_key,
            network: Network::new(protocol_family, network_id),
            receipt_timeout: Duration::from_secs(receipt_timeout_secs),
            receipt_poll_interval: Duration::from_millis(poll_ms),
        })
    }
}

fn parse_u64(raw: Option<String>, key: &str, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            message: format!("{v:?}: {e}"),
        }),
    }
}
