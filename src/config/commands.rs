//! Per-command configuration blocks (`[commands.<name>]`).

use crate::types::{Scope, ScopeKind};
use serde::Deserialize;

use super::defaults::default_true;

/// Static configuration of one command.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Alternative names resolving to this command.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// One-line help text.
    #[serde(default)]
    pub description: String,
    /// Only group admins (or the master) may run it.
    #[serde(default)]
    pub require_admin: bool,
    /// Globally switched on (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Where the command may be used. Empty means everywhere.
    #[serde(default)]
    pub allowed_scopes: Vec<ScopeRule>,
    /// Minimum seconds between two uses by the same actor (0 = none).
    #[serde(default)]
    pub cooldown_secs: u64,
    /// Stays available while lockdown is on.
    #[serde(default)]
    pub lockdown_exempt: bool,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            aliases: Vec::new(),
            description: String::new(),
            require_admin: false,
            enabled: true,
            allowed_scopes: Vec::new(),
            cooldown_secs: 0,
            lockdown_exempt: false,
        }
    }
}

/// One entry of a command's scope allow-list.
///
/// `"group"` and `"direct"` match every scope of that kind; anything else is
/// an exact scope id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ScopeRule {
    AnyOf(ScopeKind),
    Exact(String),
}

impl ScopeRule {
    pub fn matches(&self, scope: &Scope) -> bool {
        match self {
            ScopeRule::AnyOf(kind) => scope.kind() == *kind,
            ScopeRule::Exact(id) => scope.id() == id,
        }
    }
}

impl From<String> for ScopeRule {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "group" | "groups" => ScopeRule::AnyOf(ScopeKind::Group),
            "direct" | "private" => ScopeRule::AnyOf(ScopeKind::Direct),
            _ => ScopeRule::Exact(raw),
        }
    }
}
