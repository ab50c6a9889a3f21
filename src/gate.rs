//! Wiring of the admission components into one handle.

use crate::audit::{AuditSink, Redactor};
use crate::clock::Clock;
use crate::commands::{CommandBodies, CommandDescriptor, CommandTable, RegistryError, Switchboard};
use crate::config::Config;
use crate::dispatch::{Dispatcher, DispatcherParts};
use crate::http::StatusSource;
use crate::security::{CooldownTracker, PermissionCache, RateLimiter, Resolver};
use crate::services::maintenance::Sweeper;
use crate::services::moderation::Moderation;
use crate::store::Store;
use crate::types::Actor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors assembling a [`Gate`] from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("invalid redact pattern: {0}")]
    Redaction(#[from] regex::Error),
}

/// Shared admission state: one per process.
pub struct Gate {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub cache: Arc<PermissionCache>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cooldowns: Arc<CooldownTracker>,
    pub switchboard: Arc<Switchboard>,
    pub resolver: Arc<Resolver>,
    pub moderation: Arc<Moderation>,
    pub audit: Arc<AuditSink>,
    command_prefix: String,
    store_timeout: Duration,
}

impl Gate {
    /// Build every component from `config`.
    ///
    /// `defaults` are registered after the `[commands.*]` blocks, skipping any
    /// name the configuration already defines.
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        defaults: impl IntoIterator<Item = CommandDescriptor>,
    ) -> Result<Self, BuildError> {
        let store_timeout = config.database.store_timeout();
        let master = Actor::new(config.bot.master.clone());

        let mut table = CommandTable::from_config(&config.commands)?;
        for descriptor in defaults {
            if !table.contains(&descriptor.name) {
                table.register(descriptor)?;
            }
        }
        info!(commands = table.len(), "Command table built");

        let cache = Arc::new(PermissionCache::new(
            store.clone(),
            clock.clone(),
            &config.cache,
            store_timeout,
        ));
        let resolver = Arc::new(Resolver::new(
            master.clone(),
            store.clone(),
            cache.clone(),
            clock.clone(),
            store_timeout,
        ));
        let moderation = Arc::new(Moderation::new(
            store.clone(),
            cache.clone(),
            clock.clone(),
            master,
            store_timeout,
        ));
        let audit = Arc::new(AuditSink::new(
            store.clone(),
            clock.clone(),
            Redactor::new(&config.audit)?,
            store_timeout,
        ));

        Ok(Self {
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit, clock.clone())),
            cooldowns: Arc::new(CooldownTracker::new(clock.clone())),
            switchboard: Arc::new(Switchboard::new(table)),
            store,
            clock,
            cache,
            resolver,
            moderation,
            audit,
            command_prefix: config.bot.command_prefix.clone(),
            store_timeout,
        })
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    /// A dispatcher running `bodies` against this gate's state.
    pub fn dispatcher(&self, bodies: CommandBodies) -> Dispatcher {
        Dispatcher::new(DispatcherParts {
            command_prefix: self.command_prefix.clone(),
            switchboard: self.switchboard.clone(),
            bodies,
            resolver: self.resolver.clone(),
            cache: self.cache.clone(),
            rate_limiter: self.rate_limiter.clone(),
            cooldowns: self.cooldowns.clone(),
            audit: self.audit.clone(),
        })
    }

    /// State served on `/status`.
    pub fn status_source(&self) -> StatusSource {
        StatusSource {
            switchboard: self.switchboard.clone(),
            cache: self.cache.clone(),
        }
    }

    /// Tables visited by the maintenance task.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper {
            cache: self.cache.clone(),
            rate_limiter: self.rate_limiter.clone(),
            cooldowns: self.cooldowns.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
            store_timeout: self.store_timeout,
        }
    }
}
