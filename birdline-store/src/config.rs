//! Configuration management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_config_path, load_json_opt, save_json};

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Request settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Pagination settings.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Proxy rotation settings.
    #[serde(default)]
    pub egress: EgressConfig,
    /// Operation id resolution settings.
    #[serde(default)]
    pub operations: OperationsConfig,
    /// Credentials file, defaults to `credentials.json` in the config dir.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
}

/// Request settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound of the random pre-request delay in milliseconds.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
    /// Override for the web client bearer token.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Override for the user agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Override for the API origin.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Pagination settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Courtesy delay between pages in milliseconds.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

/// Proxy rotation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgressConfig {
    /// Proxy list file.
    #[serde(default)]
    pub proxy_file: Option<PathBuf>,
    /// Consecutive failures before a proxy is disabled.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long a disabled proxy sits out, in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

/// Operation id resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsConfig {
    /// How long a refreshed mapping stays valid, in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Cache file, defaults to `operation_ids.json` in the config dir.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_jitter_max_ms() -> u64 {
    200
}

fn default_page_delay_ms() -> u64 {
    1_000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_ms() -> u64 {
    300_000
}

fn default_cache_ttl_ms() -> u64 {
    86_400_000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            bearer_token: None,
            user_agent: None,
            base_url: None,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            proxy_file: None,
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: default_cache_ttl_ms(),
            cache_file: None,
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path.
    pub async fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path()).await
    }

    /// Loads configuration from a specific path.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub async fn load_from(path: &Path) -> Result<Self, StoreError> {
        match load_json_opt::<Config>(path).await {
            Ok(Some(config)) => {
                info!(path = %path.display(), "Loaded configuration");
                config.validate()?;
                Ok(config)
            }
            Ok(None) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(StoreError::Serialization(e)) => Err(StoreError::Config(format!(
                "{}: {e}",
                path.display()
            ))),
            Err(e) => Err(e),
        }
    }

    /// Saves configuration to a specific path.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Rejects values that would disable the safety mechanisms.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.network.timeout_ms == 0 {
            return Err(StoreError::Config("network.timeout_ms must be > 0".to_string()));
        }
        if self.egress.failure_threshold == 0 {
            return Err(StoreError::Config(
                "egress.failure_threshold must be > 0".to_string(),
            ));
        }
        if self.operations.cache_ttl_ms == 0 {
            return Err(StoreError::Config(
                "operations.cache_ttl_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
