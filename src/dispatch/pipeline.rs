//! The admission pipeline.
//!
//! ```text
//! Received -> silence gate -> parse -> RateLimited? -> ScopeAllowed?
//!          -> Enabled? -> Authorized? -> CooldownClear? -> execute -> audit
//! ```
//!
//! Throttles are logged and counted but not audited. Every denial, execution
//! and fault writes exactly one audit record. Command bodies run to
//! completion; errors and panics they raise become [`Outcome::Errored`].

use super::outcome::{DenyReason, Outcome, ThrottleCause};
use crate::audit::{AuditEntry, AuditSink};
use crate::commands::{
    CommandBodies, CommandDescriptor, CommandTable, Invocation, ParsedCommand, Switchboard,
    parse_command,
};
use crate::error::GateError;
use crate::metrics;
use crate::security::{CooldownTracker, PermissionCache, RateLimiter, Resolver};
use crate::telemetry::{CommandTimer, dispatch_span};
use crate::types::{Actor, Scope};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, Span, debug, info, warn};

/// Metric label for names that do not resolve to a registered command.
pub const UNKNOWN_COMMAND: &str = "unknown";

/// Everything the dispatcher composes.
pub struct DispatcherParts {
    pub command_prefix: String,
    pub switchboard: Arc<Switchboard>,
    pub bodies: CommandBodies,
    pub resolver: Arc<Resolver>,
    pub cache: Arc<PermissionCache>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cooldowns: Arc<CooldownTracker>,
    pub audit: Arc<AuditSink>,
}

/// Runs inbound events through admission and into command bodies.
pub struct Dispatcher {
    command_prefix: String,
    switchboard: Arc<Switchboard>,
    bodies: CommandBodies,
    resolver: Arc<Resolver>,
    cache: Arc<PermissionCache>,
    rate_limiter: Arc<RateLimiter>,
    cooldowns: Arc<CooldownTracker>,
    audit: Arc<AuditSink>,
}

impl Dispatcher {
    pub fn new(parts: DispatcherParts) -> Self {
        Self {
            command_prefix: parts.command_prefix,
            switchboard: parts.switchboard,
            bodies: parts.bodies,
            resolver: parts.resolver,
            cache: parts.cache,
            rate_limiter: parts.rate_limiter,
            cooldowns: parts.cooldowns,
            audit: parts.audit,
        }
    }

    /// Handle one raw inbound message.
    pub async fn on_message(&self, actor: &Actor, scope: &Scope, text: &str) -> Outcome {
        if !self.resolver.is_master(actor) && self.cache.is_silenced(scope, actor).await {
            metrics::record_suppressed();
            debug!(actor = %actor, scope = %scope, "Message from silenced sender suppressed");
            return Outcome::Suppressed;
        }

        match parse_command(text, &self.command_prefix) {
            Some(parsed) => self.dispatch(actor, scope, parsed).await,
            None => Outcome::Ignored,
        }
    }

    /// Run an already parsed command through admission and execution.
    ///
    /// The silence gate is not applied here; see [`Dispatcher::on_message`].
    pub async fn dispatch(&self, actor: &Actor, scope: &Scope, parsed: ParsedCommand) -> Outcome {
        let span = dispatch_span(actor, scope, &parsed.name);
        async move {
            let table = self.switchboard.snapshot();
            // Typed names are unbounded; only canonical names become labels.
            let label = table
                .resolve(&parsed.name)
                .map_or_else(|| UNKNOWN_COMMAND.to_string(), |d| d.name.clone());
            let outcome = self.admit_and_run(actor, scope, parsed, &table).await;
            metrics::record_outcome(&label, outcome.code());
            Span::current().record("outcome", outcome.code());
            outcome
        }
        .instrument(span)
        .await
    }

    async fn admit_and_run(
        &self,
        actor: &Actor,
        scope: &Scope,
        parsed: ParsedCommand,
        table: &CommandTable,
    ) -> Outcome {
        if !self.rate_limiter.is_allowed(actor) {
            metrics::record_rate_limited();
            debug!("Rate limited");
            return Outcome::Throttled {
                cause: ThrottleCause::RateLimited,
            };
        }

        let Some(descriptor) = table.resolve(&parsed.name) else {
            let missing = GateError::ConfigMissing(parsed.name.clone());
            debug!(error = %missing, "Unknown command treated as disabled");
            return self
                .deny(actor, scope, &parsed.name, &parsed.args, DenyReason::Disabled, missing.error_code())
                .await;
        };
        let command = descriptor.name.as_str();

        if !descriptor.permits_scope(scope) {
            return self
                .deny(actor, scope, command, &parsed.args, DenyReason::ScopeNotAllowed, "scope_not_allowed")
                .await;
        }

        if !table.is_enabled(&descriptor) {
            let code = if descriptor.enabled { "lockdown" } else { "disabled" };
            return self
                .deny(actor, scope, command, &parsed.args, DenyReason::Disabled, code)
                .await;
        }
        let Some(body) = self.bodies.get(command) else {
            return self
                .deny(actor, scope, command, &parsed.args, DenyReason::Disabled, "no_handler")
                .await;
        };

        let verdict = self.resolver.authorize(actor, scope, &descriptor).await;
        if !verdict.allowed {
            return self
                .deny(
                    actor,
                    scope,
                    command,
                    &parsed.args,
                    DenyReason::Unauthorized(verdict.reason),
                    verdict.reason.code(),
                )
                .await;
        }

        if let Err(remaining_secs) = self.cooldowns.try_begin(actor, command, descriptor.cooldown) {
            metrics::record_cooldown_blocked(command);
            debug!(remaining_secs, "Command on cooldown");
            return Outcome::Throttled {
                cause: ThrottleCause::Cooldown { remaining_secs },
            };
        }

        let invocation = Invocation {
            actor: actor.clone(),
            scope: scope.clone(),
            command: command.to_string(),
            invoked_as: parsed.name,
            args: parsed.args,
        };
        self.execute(&descriptor, body.as_ref(), invocation, verdict.reason.code())
            .await
    }

    async fn execute(
        &self,
        descriptor: &CommandDescriptor,
        body: &dyn crate::commands::CommandBody,
        invocation: Invocation,
        granted_by: &str,
    ) -> Outcome {
        let command = descriptor.name.as_str();
        let result = {
            let _timer = CommandTimer::new(command);
            AssertUnwindSafe(body.run(&invocation)).catch_unwind().await
        };

        match result {
            Ok(Ok(reply)) => {
                info!(reason = granted_by, "Command executed");
                self.audit
                    .record(AuditEntry {
                        actor: &invocation.actor,
                        scope: &invocation.scope,
                        command,
                        args: &invocation.args,
                        success: true,
                        reason: Some(granted_by),
                    })
                    .await;
                Outcome::Executed { reply }
            }
            Ok(Err(e)) => self.fault(&invocation, command, e.to_string()).await,
            Err(panic) => self.fault(&invocation, command, panic_message(panic.as_ref())).await,
        }
    }

    async fn fault(&self, invocation: &Invocation, command: &str, detail: String) -> Outcome {
        let fault = GateError::CommandFault(detail);
        let message = fault.to_string();
        warn!(code = fault.error_code(), error = %message, "Command body failed");
        self.audit
            .record(AuditEntry {
                actor: &invocation.actor,
                scope: &invocation.scope,
                command,
                args: &invocation.args,
                success: false,
                reason: Some(&message),
            })
            .await;
        Outcome::Errored { message }
    }

    async fn deny(
        &self,
        actor: &Actor,
        scope: &Scope,
        command: &str,
        args: &[String],
        reason: DenyReason,
        code: &str,
    ) -> Outcome {
        debug!(reason = code, "Command denied");
        self.audit
            .record(AuditEntry {
                actor,
                scope,
                command,
                args,
                success: false,
                reason: Some(code),
            })
            .await;
        Outcome::Denied { reason }
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
