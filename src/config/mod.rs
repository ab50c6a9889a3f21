//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, BotConfig, DatabaseConfig)
//! - [`security`]: Admission tuning (RateLimitConfig, CacheConfig, AuditConfig)
//! - [`commands`]: Per-command blocks (CommandConfig, ScopeRule)
//! - [`validation`]: Startup checks

mod commands;
mod defaults;
mod security;
mod types;
pub mod validation;

pub use commands::{CommandConfig, ScopeRule};
pub use security::{AuditConfig, CacheConfig, RateLimitConfig};
pub use types::{BotConfig, Config, ConfigError, DatabaseConfig, MetricsConfig};
