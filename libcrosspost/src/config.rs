//! Configuration management for Crosspost

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::types::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret for the cron trigger. Absent means the cron endpoint
    /// is unprovisioned and answers with a configuration error.
    pub cron_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cron_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Hard monthly send limit for X.
    #[serde(default = "default_x_monthly_limit")]
    pub x_monthly_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            x_monthly_limit: default_x_monthly_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How many posts one batch run fetches from the store before filtering.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Hard cap on posts processed per batch run.
    #[serde(default = "default_max_per_run")]
    pub max_per_run: u32,
    /// Timeout for a single adapter call.
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_per_run: default_max_per_run(),
            adapter_timeout_secs: default_adapter_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub mode: DeliveryMode,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Forward posts to configured webhook endpoints.
    #[default]
    Webhook,
    /// In-process mock adapters for every platform (development only).
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub platform: Platform,
    pub url: String,
    pub token: Option<String>,
}

fn default_db_path() -> String {
    "~/.local/share/crosspost/posts.db".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_x_monthly_limit() -> u32 {
    500
}

fn default_page_size() -> u32 {
    250
}

fn default_max_per_run() -> u32 {
    10
}

fn default_adapter_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            quota: QuotaConfig::default(),
            dispatch: DispatchConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CROSSPOST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("crosspost").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let toml_str = r#"
            [database]
            path = "/tmp/posts.db"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database.path, "/tmp/posts.db");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.cron_secret, None);
        assert_eq!(config.quota.x_monthly_limit, 500);
        assert_eq!(config.dispatch.max_per_run, 10);
        assert_eq!(config.dispatch.page_size, 250);
        assert_eq!(config.dispatch.adapter_timeout_secs, 30);
        assert_eq!(config.delivery.mode, DeliveryMode::Webhook);
        assert!(config.delivery.endpoints.is_empty());
    }

    #[test]
    fn test_full_config_parses() {
        let toml_str = r#"
            [database]
            path = "/tmp/posts.db"

            [server]
            bind = "0.0.0.0:9090"
            cron_secret = "s3cret"

            [quota]
            x_monthly_limit = 100

            [dispatch]
            page_size = 50
            max_per_run = 5
            adapter_timeout_secs = 10

            [delivery]
            mode = "mock"

            [[delivery.endpoints]]
            platform = "bluesky"
            url = "https://delivery.internal/bluesky"
            token = "tok"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.cron_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.quota.x_monthly_limit, 100);
        assert_eq!(config.dispatch.max_per_run, 5);
        assert_eq!(config.delivery.mode, DeliveryMode::Mock);
        assert_eq!(config.delivery.endpoints.len(), 1);
        assert_eq!(config.delivery.endpoints[0].platform, Platform::Bluesky);
    }

    #[test]
    fn test_default_config_round_trips() {
        let config = Config::default_config();
        let serialized = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(back.database.path, config.database.path);
        assert_eq!(back.quota.x_monthly_limit, config.quota.x_monthly_limit);
    }
}
