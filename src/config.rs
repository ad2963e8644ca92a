use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{ExporterError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl ServerConfig {
    /// Parsed listen address; only valid after [`Config::validate`] passed
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr.parse().map_err(|e| {
            ExporterError::ConfigError(format!(
                "Invalid server.listen_addr '{}': {}",
                self.listen_addr, e
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_list_retries")]
    pub list_retries: u32,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_requests: default_max_concurrent(),
            list_retries: default_list_retries(),
        }
    }
}

impl GmailConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period_secs(),
        }
    }
}

impl RefreshConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8765".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_user_id() -> String {
    "me".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    10
}

fn default_list_retries() -> u32 {
    3
}

fn default_period_secs() -> u64 {
    300
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExporterError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ExporterError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ExporterError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            ExporterError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| ExporterError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;

        if !self.server.metrics_path.starts_with('/') {
            return Err(ExporterError::ConfigError(format!(
                "server.metrics_path must start with '/', got '{}'",
                self.server.metrics_path
            )));
        }

        if self.gmail.user_id.trim().is_empty() {
            return Err(ExporterError::ConfigError(
                "gmail.user_id cannot be empty".to_string(),
            ));
        }

        if self.gmail.request_timeout_secs == 0 {
            return Err(ExporterError::ConfigError(
                "gmail.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.gmail.request_timeout_secs > 300 {
            return Err(ExporterError::ConfigError(
                "gmail.request_timeout_secs cannot exceed 300".to_string(),
            ));
        }

        // Stay well under the Gmail API per-user quota
        if self.gmail.max_concurrent_requests == 0 {
            return Err(ExporterError::ConfigError(
                "gmail.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.gmail.max_concurrent_requests > 50 {
            return Err(ExporterError::ConfigError(
                "gmail.max_concurrent_requests cannot exceed 50".to_string(),
            ));
        }

        if self.gmail.list_retries > 10 {
            return Err(ExporterError::ConfigError(
                "gmail.list_retries cannot exceed 10".to_string(),
            ));
        }

        if self.refresh.period_secs == 0 {
            return Err(ExporterError::ConfigError(
                "refresh.period_secs must be at least 1".to_string(),
            ));
        }
        if self.refresh.period_secs > 86_400 {
            return Err(ExporterError::ConfigError(
                "refresh.period_secs cannot exceed 86400 (1 day)".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::default().save(path).await
    }
}
