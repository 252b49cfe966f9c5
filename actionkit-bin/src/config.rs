use std::net::SocketAddr;

use actionkit_runtime::{ConfigError, RuntimeConfig};

pub const DEFAULT_API_BIND: &str = "0.0.0.0:9100";

/// Everything the binary reads from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub runtime: RuntimeConfig,
    pub api_token: String,
    pub bind: SocketAddr,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("runtime", &self.runtime)
            .field("api_token", &"<redacted>")
            .field("bind", &self.bind)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let api_token = get("API_TOKEN");

        let runtime = match (RuntimeConfig::from_lookup(&lookup), &api_token) {
            (Ok(runtime), Some(_)) => runtime,
            (Ok(_), None) => return Err(ConfigError::Missing(vec!["API_TOKEN".into()])),
            (Err(ConfigError::Missing(mut keys)), None) => {
                keys.push("API_TOKEN".into());
                return Err(ConfigError::Missing(keys));
            }
            (Err(e), _) => return Err(e),
        };

        let bind_raw = get("API_BIND").unwrap_or_else(|| DEFAULT_API_BIND.to_string());
        let bind = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            key: "API_BIND".into(),
            message: format!("{bind_raw:?}: {e}"),
        })?;

        Ok(Self {
            runtime,
            api_token: api_token.unwrap_or_default(),
            bind,
        })
    }
}
