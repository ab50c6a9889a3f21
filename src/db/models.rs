//! Durable record models.
//!
//! Timestamps are Unix seconds, matching the schema in `migrations/`.

use crate::types::Actor;
use serde::Serialize;

/// Administrative privilege of an actor within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminGrant {
    pub scope: String,
    pub actor: Actor,
    pub granted_by: Actor,
    pub granted_at: i64,
}

/// Explicit allow/deny override for one (scope, actor, command).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialPermission {
    pub scope: String,
    pub actor: Actor,
    pub command: String,
    pub allowed: bool,
    pub granted_by: Actor,
    pub granted_at: i64,
    /// Optional expiration timestamp (None = until revoked).
    pub expires_at: Option<i64>,
}

impl SpecialPermission {
    /// Check if this override still applies at `now`.
    pub fn is_active(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires) => now <= expires,
            None => true,
        }
    }
}

/// Moderation record suppressing an actor's messages in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceRecord {
    pub scope: String,
    pub actor: Actor,
    pub silenced_by: Actor,
    pub created_at: i64,
    /// Optional expiration timestamp (None = permanent).
    pub expires_at: Option<i64>,
}

impl SilenceRecord {
    /// Check if this silence has lapsed at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }
}

/// Immutable record of one dispatch decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub id: String,
    pub actor: Actor,
    pub scope: String,
    pub command: String,
    pub arguments_redacted: String,
    pub success: bool,
    pub reason: Option<String>,
    pub timestamp: i64,
}
