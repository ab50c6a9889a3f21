//! Command table snapshots and runtime switches.
//!
//! The dispatcher takes one immutable [`CommandTable`] snapshot per event.
//! Runtime toggles go through the [`Switchboard`], which builds a new table
//! and swaps it in; snapshots already handed out are unaffected. The maps
//! are persistent (`im`), so snapshots and updates share structure.

use super::descriptor::CommandDescriptor;
use crate::config::CommandConfig;
use crate::error::{GateError, GateResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Registration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("'{name}' is already registered for command '{existing}'")]
    DuplicateName { name: String, existing: String },
}

/// Immutable view of every registered command.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: im::HashMap<String, Arc<CommandDescriptor>>,
    /// Canonical names and aliases, all lowercase, to canonical name.
    lookup: im::HashMap<String, String>,
    lockdown: bool,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from the `[commands.*]` configuration blocks.
    pub fn from_config(commands: &BTreeMap<String, CommandConfig>) -> Result<Self, RegistryError> {
        let mut table = Self::new();
        for (name, config) in commands {
            table.register(CommandDescriptor::from_config(name, config))?;
        }
        Ok(table)
    }

    /// Add a descriptor, resolving its aliases to it once.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        let canonical = descriptor.name.clone();
        let names: Vec<String> = std::iter::once(canonical.clone())
            .chain(descriptor.aliases.iter().cloned())
            .collect();

        for name in &names {
            if let Some(existing) = self.lookup.get(name) {
                return Err(RegistryError::DuplicateName {
                    name: name.clone(),
                    existing: existing.clone(),
                });
            }
        }
        for name in names {
            self.lookup.insert(name, canonical.clone());
        }
        self.commands.insert(canonical, Arc::new(descriptor));
        Ok(())
    }

    /// Find a command by canonical name or alias (case-insensitive).
    pub fn resolve(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        let canonical = self.lookup.get(&name.to_lowercase())?;
        self.commands.get(canonical).cloned()
    }

    /// Whether `name` is a registered canonical name or alias.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(&name.to_lowercase())
    }

    /// Whether lockdown is on.
    pub fn lockdown(&self) -> bool {
        self.lockdown
    }

    /// Global enablement: the command's own switch, then lockdown.
    pub fn is_enabled(&self, descriptor: &CommandDescriptor) -> bool {
        descriptor.enabled && (!self.lockdown || descriptor.lockdown_exempt)
    }

    /// All descriptors ordered by name.
    pub fn descriptors(&self) -> Vec<Arc<CommandDescriptor>> {
        let mut all: Vec<_> = self.commands.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Narrow mutation API for runtime command toggles.
#[derive(Debug, Default)]
pub struct Switchboard {
    current: RwLock<CommandTable>,
}

impl Switchboard {
    pub fn new(table: CommandTable) -> Self {
        Self {
            current: RwLock::new(table),
        }
    }

    /// The table as of now. Cheap: persistent maps clone in O(1).
    pub fn snapshot(&self) -> CommandTable {
        self.current.read().clone()
    }

    /// Switch a command on or off by name or alias.
    ///
    /// Returns the canonical name that was changed.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> GateResult<String> {
        let mut table = self.current.write();
        let descriptor = table
            .resolve(name)
            .ok_or_else(|| GateError::ConfigMissing(name.to_string()))?;

        let mut updated = (*descriptor).clone();
        updated.enabled = enabled;
        let canonical = updated.name.clone();
        table.commands.insert(canonical.clone(), Arc::new(updated));

        info!(command = %canonical, enabled, "Command toggled");
        Ok(canonical)
    }

    /// Turn lockdown on or off.
    pub fn set_lockdown(&self, on: bool) {
        self.current.write().lockdown = on;
        info!(lockdown = on, "Lockdown toggled");
    }
}
