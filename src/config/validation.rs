//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bot.master is required")]
    MissingMaster,
    #[error("bot.command_prefix must not be empty")]
    EmptyCommandPrefix,
    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroRateWindow,
    #[error("rate_limit.max_per_window must be greater than zero")]
    ZeroRateCeiling,
    #[error("cache.admin_ttl_secs ({admin}) must not be shorter than cache.silence_ttl_secs ({silence})")]
    AdminTtlShorterThanSilence { admin: u64, silence: u64 },
    #[error("cache.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,
    #[error("database.store_timeout_ms must be greater than zero")]
    ZeroStoreTimeout,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("command name or alias '{name}' is claimed by both '{first}' and '{second}'")]
    DuplicateCommandName {
        name: String,
        first: String,
        second: String,
    },
    #[error("audit.redact_patterns entry '{0}' is not a valid regex")]
    InvalidRedactPattern(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bot.master.trim().is_empty() {
        errors.push(ValidationError::MissingMaster);
    }
    if config.bot.command_prefix.is_empty() {
        errors.push(ValidationError::EmptyCommandPrefix);
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroRateWindow);
    }
    if config.rate_limit.max_per_window == 0 {
        errors.push(ValidationError::ZeroRateCeiling);
    }

    if config.cache.admin_ttl_secs < config.cache.silence_ttl_secs {
        errors.push(ValidationError::AdminTtlShorterThanSilence {
            admin: config.cache.admin_ttl_secs,
            silence: config.cache.silence_ttl_secs,
        });
    }

    if config.cache.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    if config.database.store_timeout_ms == 0 {
        errors.push(ValidationError::ZeroStoreTimeout);
    }
    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    // Canonical names and aliases share one namespace.
    let mut owners: HashMap<String, &str> = HashMap::new();
    for (name, cmd) in &config.commands {
        for key in std::iter::once(name).chain(cmd.aliases.iter()) {
            let key = key.to_lowercase();
            if let Some(first) = owners.get(&key) {
                errors.push(ValidationError::DuplicateCommandName {
                    name: key.clone(),
                    first: first.to_string(),
                    second: name.clone(),
                });
            } else {
                owners.insert(key, name.as_str());
            }
        }
    }

    for pattern in &config.audit.redact_patterns {
        if regex::Regex::new(pattern).is_err() {
            errors.push(ValidationError::InvalidRedactPattern(pattern.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
