//! Command descriptors.

use crate::config::{CommandConfig, ScopeRule};
use crate::types::Scope;
use std::time::Duration;

/// Everything the pipeline needs to know about one command.
///
/// Keyed by its canonical lowercase `name`; aliases are resolved to the
/// descriptor once, when it is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub require_admin: bool,
    pub enabled: bool,
    pub allowed_scopes: Vec<ScopeRule>,
    pub cooldown: Duration,
    pub lockdown_exempt: bool,
}

impl CommandDescriptor {
    /// A public, enabled command usable everywhere without cooldown.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            aliases: Vec::new(),
            description: String::new(),
            require_admin: false,
            enabled: true,
            allowed_scopes: Vec::new(),
            cooldown: Duration::ZERO,
            lockdown_exempt: false,
        }
    }

    pub fn from_config(name: &str, config: &CommandConfig) -> Self {
        Self {
            name: name.to_lowercase(),
            aliases: config.aliases.iter().map(|a| a.to_lowercase()).collect(),
            description: config.description.clone(),
            require_admin: config.require_admin,
            enabled: config.enabled,
            allowed_scopes: config.allowed_scopes.clone(),
            cooldown: Duration::from_secs(config.cooldown_secs),
            lockdown_exempt: config.lockdown_exempt,
        }
    }

    pub fn admin_only(mut self) -> Self {
        self.require_admin = true;
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_lowercase()).collect();
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_scopes(mut self, rules: Vec<ScopeRule>) -> Self {
        self.allowed_scopes = rules;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn lockdown_exempt(mut self) -> Self {
        self.lockdown_exempt = true;
        self
    }

    /// Static scope allow-list check, independent of who is asking.
    pub fn permits_scope(&self, scope: &Scope) -> bool {
        self.allowed_scopes.is_empty() || self.allowed_scopes.iter().any(|r| r.matches(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScopeKind;

    #[test]
    fn test_from_config_normalizes_names() {
        let config = CommandConfig {
            aliases: vec!["BC".into()],
            cooldown_secs: 600,
            require_admin: true,
            ..CommandConfig::default()
        };
        let desc = CommandDescriptor::from_config("Broadcast", &config);
        assert_eq!(desc.name, "broadcast");
        assert_eq!(desc.aliases, vec!["bc".to_string()]);
        assert_eq!(desc.cooldown, Duration::from_secs(600));
        assert!(desc.require_admin);
    }

    #[test]
    fn test_permits_scope() {
        let anywhere = CommandDescriptor::new("ping");
        assert!(anywhere.permits_scope(&Scope::direct("x")));

        let groups_only =
            CommandDescriptor::new("kick").with_scopes(vec![ScopeRule::AnyOf(ScopeKind::Group)]);
        assert!(groups_only.permits_scope(&Scope::group("g1")));
        assert!(!groups_only.permits_scope(&Scope::direct("x")));

        let one_group = CommandDescriptor::new("quiz").with_scopes(vec![ScopeRule::Exact("g1".into())]);
        assert!(one_group.permits_scope(&Scope::group("g1")));
        assert!(!one_group.permits_scope(&Scope::group("g2")));
    }
}
