//! Authorization resolver.
//!
//! Decides whether an actor may run a command in a scope. Precedence, first
//! match wins:
//!
//! 1. The master actor is always allowed.
//! 2. An unexpired special permission for (scope, actor, command) decides,
//!    whether it grants or denies.
//! 3. Commands that do not require admin are allowed.
//! 4. In a group, admin-only commands require an admin grant.
//! 5. In a direct chat, admin-only commands are denied.
//! 6. Anything else is allowed.
//!
//! [`decide`] encodes the order as a pure function over [`AuthFacts`];
//! [`Resolver::authorize`] gathers only the facts the order actually needs.

use super::permission_cache::PermissionCache;
use crate::clock::Clock;
use crate::commands::CommandDescriptor;
use crate::metrics;
use crate::store::{Store, bounded};
use crate::types::{Actor, Scope, ScopeKind};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Why a verdict came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Master,
    SpecialGrant,
    SpecialDeny,
    PublicCommand,
    GroupAdmin,
    NotGroupAdmin,
    AdminOnlyInGroups,
    Fallback,
    StoreUnavailable,
}

impl Reason {
    /// Stable code used in audit records and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Reason::Master => "master",
            Reason::SpecialGrant => "special_grant",
            Reason::SpecialDeny => "special_deny",
            Reason::PublicCommand => "public_command",
            Reason::GroupAdmin => "group_admin",
            Reason::NotGroupAdmin => "not_group_admin",
            Reason::AdminOnlyInGroups => "admin_only_in_groups",
            Reason::Fallback => "fallback",
            Reason::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Allow/deny decision with its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: Reason,
}

impl Verdict {
    pub fn allow(reason: Reason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    pub fn deny(reason: Reason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// Inputs to [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFacts {
    pub is_master: bool,
    /// `allowed` of an unexpired special permission, if one exists.
    pub special: Option<bool>,
    pub require_admin: bool,
    pub scope_kind: ScopeKind,
    pub group_admin: bool,
}

/// Apply the precedence rules to a set of facts.
pub fn decide(facts: &AuthFacts) -> Verdict {
    if facts.is_master {
        return Verdict::allow(Reason::Master);
    }
    if let Some(allowed) = facts.special {
        return if allowed {
            Verdict::allow(Reason::SpecialGrant)
        } else {
            Verdict::deny(Reason::SpecialDeny)
        };
    }
    if !facts.require_admin {
        return Verdict::allow(Reason::PublicCommand);
    }
    if facts.scope_kind == ScopeKind::Group {
        return if facts.group_admin {
            Verdict::allow(Reason::GroupAdmin)
        } else {
            Verdict::deny(Reason::NotGroupAdmin)
        };
    }
    if facts.scope_kind == ScopeKind::Direct && facts.require_admin {
        return Verdict::deny(Reason::AdminOnlyInGroups);
    }
    Verdict::allow(Reason::Fallback)
}

/// Gathers facts from the store and permission cache and applies [`decide`].
pub struct Resolver {
    master: Actor,
    store: Arc<dyn Store>,
    cache: Arc<PermissionCache>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl Resolver {
    pub fn new(
        master: Actor,
        store: Arc<dyn Store>,
        cache: Arc<PermissionCache>,
        clock: Arc<dyn Clock>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            master,
            store,
            cache,
            clock,
            store_timeout,
        }
    }

    pub fn is_master(&self, actor: &Actor) -> bool {
        *actor == self.master
    }

    pub fn master(&self) -> &Actor {
        &self.master
    }

    /// Decide whether `actor` may run `command` in `scope`.
    pub async fn authorize(
        &self,
        actor: &Actor,
        scope: &Scope,
        command: &CommandDescriptor,
    ) -> Verdict {
        let mut facts = AuthFacts {
            is_master: self.is_master(actor),
            special: None,
            require_admin: command.require_admin,
            scope_kind: scope.kind(),
            group_admin: false,
        };
        if facts.is_master {
            return decide(&facts);
        }

        let scope_key = scope.key();
        let lookup = self
            .store
            .find_special_permission(&scope_key, actor, &command.name);
        match bounded(self.store_timeout, lookup).await {
            Ok(Some(perm)) if perm.is_active(self.clock.now_secs()) => {
                facts.special = Some(perm.allowed);
            }
            Ok(_) => {}
            Err(e) => {
                metrics::record_store_error("find_special_permission");
                warn!(
                    actor = %actor,
                    scope = %scope,
                    command = %command.name,
                    error = %e,
                    "Special permission lookup failed, denying"
                );
                return Verdict::deny(Reason::StoreUnavailable);
            }
        }

        if facts.special.is_none() && facts.require_admin && scope.is_group() {
            facts.group_admin = self.cache.is_group_admin(scope, actor).await;
        }

        let verdict = decide(&facts);
        debug!(
            actor = %actor,
            scope = %scope,
            command = %command.name,
            allowed = verdict.allowed,
            reason = %verdict.reason,
            "Authorization resolved"
        );
        verdict
    }
}
