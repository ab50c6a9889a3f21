//! Moderation mutations.
//!
//! The only place that writes admin grants, silences and special
//! permissions. Each mutation writes the store first and then invalidates the
//! matching cache entry before returning, so the next check on that key
//! reads the new state. The invalidation also runs when the write reports an
//! error, since a write can land even though its acknowledgement did not.
//! The master can never lose admin or be silenced.

use crate::clock::Clock;
use crate::db::{AdminGrant, SilenceRecord, SpecialPermission};
use crate::error::{GateError, GateResult};
use crate::security::PermissionCache;
use crate::store::{Store, bounded};
use crate::types::{Actor, Scope};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Longest timed silence or override accepted: about 100 years.
pub const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

pub struct Moderation {
    store: Arc<dyn Store>,
    cache: Arc<PermissionCache>,
    clock: Arc<dyn Clock>,
    master: Actor,
    store_timeout: Duration,
}

impl Moderation {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<PermissionCache>,
        clock: Arc<dyn Clock>,
        master: Actor,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            master,
            store_timeout,
        }
    }

    fn protect_master(&self, actor: &Actor, action: &str) -> GateResult<()> {
        if *actor == self.master {
            return Err(GateError::InvariantViolation(format!(
                "cannot {action} the master"
            )));
        }
        Ok(())
    }

    /// Absolute expiry in Unix seconds, or `None` for permanent.
    fn expiry(&self, duration: Option<Duration>) -> GateResult<Option<i64>> {
        let Some(duration) = duration else {
            return Ok(None);
        };
        if duration > MAX_DURATION {
            return Err(GateError::InvariantViolation(format!(
                "duration of {}s exceeds the maximum of {}s",
                duration.as_secs(),
                MAX_DURATION.as_secs()
            )));
        }
        i64::try_from(duration.as_secs())
            .ok()
            .and_then(|secs| self.clock.now_secs().checked_add(secs))
            .map(Some)
            .ok_or_else(|| GateError::InvariantViolation("expiry out of range".into()))
    }

    pub async fn grant_admin(&self, scope: &Scope, actor: &Actor, by: &Actor) -> GateResult<()> {
        let grant = AdminGrant {
            scope: scope.key(),
            actor: actor.clone(),
            granted_by: by.clone(),
            granted_at: self.clock.now_secs(),
        };
        let written = bounded(self.store_timeout, self.store.put_admin_grant(&grant)).await;
        self.cache.invalidate_admin(scope, actor);
        written?;
        info!(scope = %scope, actor = %actor, by = %by, "Admin granted");
        Ok(())
    }

    /// Returns whether a grant existed.
    pub async fn revoke_admin(&self, scope: &Scope, actor: &Actor) -> GateResult<bool> {
        self.protect_master(actor, "revoke admin from")?;
        let deleted = bounded(
            self.store_timeout,
            self.store.delete_admin_grant(&scope.key(), actor),
        )
        .await;
        self.cache.invalidate_admin(scope, actor);
        let existed = deleted?;
        info!(scope = %scope, actor = %actor, existed, "Admin revoked");
        Ok(existed)
    }

    /// Silence `actor` in `scope` for `duration`, or permanently when `None`.
    pub async fn silence(
        &self,
        scope: &Scope,
        actor: &Actor,
        by: &Actor,
        duration: Option<Duration>,
    ) -> GateResult<()> {
        self.protect_master(actor, "silence")?;
        let record = SilenceRecord {
            scope: scope.key(),
            actor: actor.clone(),
            silenced_by: by.clone(),
            created_at: self.clock.now_secs(),
            expires_at: self.expiry(duration)?,
        };
        let written = bounded(self.store_timeout, self.store.put_silence_record(&record)).await;
        self.cache.invalidate_silence(scope, actor);
        written?;
        info!(scope = %scope, actor = %actor, by = %by, expires_at = ?record.expires_at, "Actor silenced");
        Ok(())
    }

    /// Returns whether a silence existed.
    pub async fn unsilence(&self, scope: &Scope, actor: &Actor) -> GateResult<bool> {
        let deleted = bounded(
            self.store_timeout,
            self.store.delete_silence_record(&scope.key(), actor),
        )
        .await;
        self.cache.invalidate_silence(scope, actor);
        let existed = deleted?;
        info!(scope = %scope, actor = %actor, existed, "Actor unsilenced");
        Ok(existed)
    }

    /// Set an explicit allow (`allowed = true`) or deny override for one command.
    pub async fn grant_special(
        &self,
        scope: &Scope,
        actor: &Actor,
        command: &str,
        allowed: bool,
        by: &Actor,
        duration: Option<Duration>,
    ) -> GateResult<()> {
        if !allowed {
            self.protect_master(actor, "forbid commands to")?;
        }
        let perm = SpecialPermission {
            scope: scope.key(),
            actor: actor.clone(),
            command: command.to_lowercase(),
            allowed,
            granted_by: by.clone(),
            granted_at: self.clock.now_secs(),
            expires_at: self.expiry(duration)?,
        };
        bounded(self.store_timeout, self.store.put_special_permission(&perm)).await?;
        info!(scope = %scope, actor = %actor, command = %perm.command, allowed, by = %by, "Special permission set");
        Ok(())
    }

    /// Returns whether an override existed.
    pub async fn revoke_special(
        &self,
        scope: &Scope,
        actor: &Actor,
        command: &str,
    ) -> GateResult<bool> {
        let command = command.to_lowercase();
        let existed = bounded(
            self.store_timeout,
            self.store
                .delete_special_permission(&scope.key(), actor, &command),
        )
        .await?;
        info!(scope = %scope, actor = %actor, command = %command, existed, "Special permission removed");
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::store::MemoryStore;

    fn g1() -> Scope {
        Scope::group("g1")
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        cache: Arc<PermissionCache>,
        clock: Arc<ManualClock>,
        moderation: Moderation,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let timeout = Duration::from_millis(100);
        let cache = Arc::new(PermissionCache::new(
            store.clone(),
            clock.clone(),
            &CacheConfig::default(),
            timeout,
        ));
        let moderation = Moderation::new(
            store.clone(),
            cache.clone(),
            clock.clone(),
            Actor::new("master"),
            timeout,
        );
        Fixture {
            store,
            cache,
            clock,
            moderation,
        }
    }

    #[tokio::test]
    async fn test_grant_then_revoke_visible_immediately() {
        let f = fixture();
        let alice = Actor::new("alice");
        let master = Actor::new("master");

        assert!(!f.cache.is_group_admin(&g1(), &alice).await);
        f.moderation.grant_admin(&g1(), &alice, &master).await.unwrap();
        assert!(f.cache.is_group_admin(&g1(), &alice).await);

        assert!(f.moderation.revoke_admin(&g1(), &alice).await.unwrap());
        assert!(!f.cache.is_group_admin(&g1(), &alice).await);
        assert!(!f.moderation.revoke_admin(&g1(), &alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_master_cannot_be_revoked_or_silenced() {
        let f = fixture();
        let master = Actor::new("master");

        let err = f.moderation.revoke_admin(&g1(), &master).await.unwrap_err();
        assert_eq!(err.error_code(), "invariant_violation");

        let err = f
            .moderation
            .silence(&g1(), &master, &master, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvariantViolation(_)));

        let err = f
            .moderation
            .grant_special(&g1(), &master, "ping", false, &master, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_timed_silence_expires() {
        let f = fixture();
        let bob = Actor::new("bob");
        let master = Actor::new("master");

        f.moderation
            .silence(&g1(), &bob, &master, Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(f.cache.is_silenced(&g1(), &bob).await);

        f.clock.advance(Duration::from_secs(61));
        assert!(!f.cache.is_silenced(&g1(), &bob).await);
    }

    #[tokio::test]
    async fn test_unsilence_invalidates_cached_value() {
        let f = fixture();
        let bob = Actor::new("bob");
        let master = Actor::new("master");

        f.moderation.silence(&g1(), &bob, &master, None).await.unwrap();
        assert!(f.cache.is_silenced(&g1(), &bob).await);

        assert!(f.moderation.unsilence(&g1(), &bob).await.unwrap());
        assert!(!f.cache.is_silenced(&g1(), &bob).await);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_store_unavailable() {
        let f = fixture();
        f.store.set_unavailable(true);
        let err = f
            .moderation
            .grant_admin(&g1(), &Actor::new("alice"), &Actor::new("master"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "store_unavailable");
    }

    #[tokio::test]
    async fn test_special_permission_roundtrip() {
        let f = fixture();
        let bob = Actor::new("bob");
        let master = Actor::new("master");

        f.moderation
            .grant_special(&g1(), &bob, "Kick", true, &master, Some(Duration::from_secs(30)))
            .await
            .unwrap();
        let perm = f
            .store
            .find_special_permission("group:g1", &bob, "kick")
            .await
            .unwrap()
            .unwrap();
        assert!(perm.allowed);
        assert_eq!(perm.expires_at, Some(f.clock.now_secs() + 30));

        assert!(f.moderation.revoke_special(&g1(), &bob, "KICK").await.unwrap());
    }

    #[tokio::test]
    async fn test_lost_ack_still_invalidates() {
        let f = fixture();
        let alice = Actor::new("alice");
        let master = Actor::new("master");

        f.moderation.grant_admin(&g1(), &alice, &master).await.unwrap();
        assert!(f.cache.is_group_admin(&g1(), &alice).await);

        f.store.set_lost_acks(true);
        let err = f.moderation.revoke_admin(&g1(), &alice).await.unwrap_err();
        assert_eq!(err.error_code(), "store_unavailable");
        assert!(!f.cache.is_group_admin(&g1(), &alice).await);

        let bob = Actor::new("bob");
        assert!(!f.cache.is_silenced(&g1(), &bob).await);
        assert!(f.moderation.silence(&g1(), &bob, &master, None).await.is_err());
        assert!(f.cache.is_silenced(&g1(), &bob).await);

        assert!(f.moderation.unsilence(&g1(), &bob).await.is_err());
        assert!(!f.cache.is_silenced(&g1(), &bob).await);
    }

    #[tokio::test]
    async fn test_out_of_range_duration_rejected_before_write() {
        let f = fixture();
        let bob = Actor::new("bob");
        let master = Actor::new("master");

        for duration in [Duration::MAX, MAX_DURATION + Duration::from_secs(1)] {
            let err = f
                .moderation
                .silence(&g1(), &bob, &master, Some(duration))
                .await
                .unwrap_err();
            assert!(matches!(err, GateError::InvariantViolation(_)));

            let err = f
                .moderation
                .grant_special(&g1(), &bob, "ping", true, &master, Some(duration))
                .await
                .unwrap_err();
            assert!(matches!(err, GateError::InvariantViolation(_)));
        }
        assert!(!f.cache.is_silenced(&g1(), &bob).await);

        f.moderation
            .silence(&g1(), &bob, &master, Some(MAX_DURATION))
            .await
            .unwrap();
        assert!(f.cache.is_silenced(&g1(), &bob).await);
    }
}
