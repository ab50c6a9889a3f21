//! Admission configuration: rate limiting, permission cache and audit.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::{
    default_admin_ttl_secs, default_max_argument_len, default_max_per_window,
    default_silence_ttl_secs, default_sweep_interval_secs, default_true, default_window_secs,
};

/// Fixed-window rate limit applied to every actor regardless of command.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Commands allowed per actor per window (default: 5).
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,
    /// Window length in seconds (default: 10).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: default_max_per_window(),
            window_secs: default_window_secs(),
        }
    }
}

/// Permission cache configuration.
///
/// Admin structure changes rarely, silences change often and must take
/// effect promptly, so the two predicates carry separate TTLs.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached admin flag in seconds (default: 300).
    #[serde(default = "default_admin_ttl_secs")]
    pub admin_ttl_secs: u64,
    /// Lifetime of a cached silence flag in seconds (default: 30).
    #[serde(default = "default_silence_ttl_secs")]
    pub silence_ttl_secs: u64,
    /// How often the maintenance task purges expired entries (default: 60).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Result of a silence check when the store fails and nothing is cached
    /// (default: true, i.e. suppress the message).
    #[serde(default = "default_true")]
    pub silence_fail_closed: bool,
}

impl CacheConfig {
    pub fn admin_ttl(&self) -> Duration {
        Duration::from_secs(self.admin_ttl_secs)
    }

    pub fn silence_ttl(&self) -> Duration {
        Duration::from_secs(self.silence_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            admin_ttl_secs: default_admin_ttl_secs(),
            silence_ttl_secs: default_silence_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            silence_fail_closed: true,
        }
    }
}

/// Audit trail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Extra regex patterns whose matches are masked in recorded arguments.
    /// Long digit runs (phone numbers) are always masked.
    #[serde(default)]
    pub redact_patterns: Vec<String>,
    /// Recorded arguments are truncated to this many characters (default: 256).
    #[serde(default = "default_max_argument_len")]
    pub max_argument_len: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            redact_patterns: Vec::new(),
            max_argument_len: default_max_argument_len(),
        }
    }
}
