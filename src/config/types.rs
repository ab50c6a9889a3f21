//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::commands::CommandConfig;
use super::defaults::{
    default_bot_name, default_command_prefix, default_database_path, default_store_timeout_ms,
};
use super::security::{AuditConfig, CacheConfig, RateLimitConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot identity.
    pub bot: BotConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Per-actor command volume limit.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Permission cache TTLs and sweep cadence.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Audit trail configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Prometheus endpoint configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Command table keyed by canonical name.
    #[serde(default)]
    pub commands: BTreeMap<String, CommandConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Display name used in replies and logs.
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Actor id of the master. The master is admin everywhere and can never
    /// be denied, demoted or silenced.
    pub master: String,
    /// Prefix that marks a message as a command (default: "!").
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, or ":memory:".
    #[serde(default = "default_database_path")]
    pub path: String,
    /// Upper bound for any single store call made by the pipeline (default: 2000).
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

/// Prometheus endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Port for the `/metrics` HTTP endpoint. Disabled when absent.
    pub port: Option<u16>,
}
