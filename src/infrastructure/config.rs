//! Configuration infrastructure.
//!
//! All tunables live in one `AppConfig` tree persisted as JSON. Secrets are
//! never stored in the file; each backend section names the environment
//! variable its API key is read from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::application::executor::ExecutorConfig;
use crate::domain::services::conflict_detector::ConflictConfig;
use crate::domain::services::matcher::MatchingConfig;
use crate::infrastructure::catalog_search::CatalogSearchConfig;

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub web: WebConfig,
    pub executor: ExecutorConfig,
    pub matching: MatchingConfig,
    pub conflicts: ConflictConfig,
    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
}

/// Catalog backend settings: vector index plus embedding endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub index_endpoint: String,
    pub collection: String,
    pub embedding_base_url: String,
    pub embedding_model: String,
    /// Environment variable holding the embedding API key
    pub embedding_api_key_env: String,
    pub timeout_seconds: u64,
    pub embedding_max_retries: usize,
    pub thresholds: CatalogSearchConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            index_endpoint: "http://localhost:6333".to_string(),
            collection: "products".to_string(),
            embedding_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 30,
            embedding_max_retries: 3,
            thresholds: CatalogSearchConfig::default(),
        }
    }
}

/// Web shopping-search backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub endpoint: String,
    /// Environment variable holding the backend API key
    pub api_key_env: String,
    pub engine: String,
    pub language: String,
    pub country: String,
    pub timeout_seconds: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://serpapi.com/search".to_string(),
            api_key_env: "SERPAPI_KEY".to_string(),
            engine: "google_shopping".to_string(),
            language: "en".to_string(),
            country: "us".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// TTL cache settings shared by both adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_seconds: 300 }
    }
}

/// Web backend admission control settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_calls_per_minute: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_calls_per_minute: 10,
        }
    }
}

/// Errors from configuration loading and saving.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine user config directory")]
    NoConfigDir,
    #[error("failed to read or write configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads and saves `AppConfig` as JSON.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Manager over the default per-user config path.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?.join("price-scout");
        Ok(Self {
            config_path: config_dir.join("config.json"),
        })
    }

    /// Manager over an explicit config path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Loads configuration from file, writing defaults on first run.
    pub async fn load_config(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_path.exists() {
            info!(path = ?self.config_path, "configuration file not found, creating default");
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path).await?;
        let config = serde_json::from_str::<AppConfig>(&content)?;
        info!(path = ?self.config_path, "loaded configuration");
        Ok(config)
    }

    /// Saves configuration, creating the directory when needed.
    pub async fn save_config(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await?;
        Ok(())
    }
}
