//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Bot Defaults
// =============================================================================

pub fn default_bot_name() -> String {
    "chatgate".to_string()
}

pub fn default_command_prefix() -> String {
    "!".to_string()
}

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "chatgate.db".to_string()
}

pub fn default_store_timeout_ms() -> u64 {
    2_000
}

// =============================================================================
// Rate Limit Defaults
// =============================================================================

pub fn default_max_per_window() -> u32 {
    5
}

pub fn default_window_secs() -> u64 {
    10
}

// =============================================================================
// Cache Defaults
// =============================================================================

pub fn default_admin_ttl_secs() -> u64 {
    300
}

pub fn default_silence_ttl_secs() -> u64 {
    30
}

pub fn default_sweep_interval_secs() -> u64 {
    60
}

// =============================================================================
// Audit Defaults
// =============================================================================

pub fn default_max_argument_len() -> usize {
    256
}
