//! Client configuration.

use crate::error::{ClientError, ClientResult};
use omni_core::AppId;
use omni_txn::{StorageCostSchedule, DEFAULT_VALIDITY_WINDOW};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "OMNI_CONFIG";

/// Configuration path used when `OMNI_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Node connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node REST base URL.
    #[serde(default = "default_node_url")]
    pub url: String,
    /// API token sent as `X-Algod-API-Token`. Empty for public nodes.
    #[serde(default)]
    pub token: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_node_url() -> String {
    "https://testnet-api.algonode.cloud".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: default_node_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token(&self) -> Option<String> {
        Some(self.token.clone()).filter(|t| !t.is_empty())
    }
}

/// Marketplace client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Marketplace application id.
    #[serde(default)]
    pub app_id: u64,
    /// Confirmation checks before an execution times out.
    #[serde(default = "default_confirmation_rounds")]
    pub confirmation_rounds: u32,
    /// Rounds a composed group stays valid.
    #[serde(default = "default_validity_window")]
    pub validity_window: u64,
    #[serde(default)]
    pub node: NodeConfig,
    /// Storage payment attached to list actions.
    #[serde(default)]
    pub storage_cost: StorageCostSchedule,
}

fn default_confirmation_rounds() -> u32 {
    4
}

fn default_validity_window() -> u64 {
    DEFAULT_VALIDITY_WINDOW
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            app_id: 0,
            confirmation_rounds: default_confirmation_rounds(),
            validity_window: default_validity_window(),
            node: NodeConfig::default(),
            storage_cost: StorageCostSchedule::default(),
        }
    }
}

impl MarketConfig {
    /// Load from `OMNI_CONFIG`, falling back to `config/default.toml`, then
    /// to defaults if no file exists.
    pub fn load() -> ClientResult<Self> {
        let config_path =
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ClientResult<Self> {
        toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject configurations the client cannot run with.
    pub fn validate(&self) -> ClientResult<()> {
        if self.app_id == 0 {
            return Err(ClientError::Config("app_id must be set".to_string()));
        }
        if self.confirmation_rounds == 0 {
            return Err(ClientError::Config(
                "confirmation_rounds must be at least 1".to_string(),
            ));
        }
        if self.validity_window == 0 {
            return Err(ClientError::Config(
                "validity_window must be at least 1".to_string(),
            ));
        }
        if self.node.url.trim().is_empty() {
            return Err(ClientError::Config("node.url must be set".to_string()));
        }
        if self.node.timeout_secs == 0 {
            return Err(ClientError::Config(
                "node.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn app(&self) -> AppId {
        AppId::new(self.app_id)
    }
}
