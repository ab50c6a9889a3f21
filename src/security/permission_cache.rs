//! Read-through cache over the two hot permission predicates.
//!
//! `is_group_admin` and `is_silenced` run for almost every inbound event, so
//! their answers are shadowed in memory with independent TTLs. The store stays
//! authoritative: mutation paths write the store and then call
//! `invalidate_admin` / `invalidate_silence`; they never write the cache.
//!
//! # Failure policy
//!
//! - Admin lookups fail closed: a store error or timeout reads as "not admin".
//! - Silence lookups fall back to the last known cached value, even if it
//!   has expired. With nothing cached the configured `silence_fail_closed`
//!   value is returned (default: silenced).
//! - Failures are never cached, so the next event retries the store.
//!
//! # Invalidation races
//!
//! Each table carries an epoch that every invalidation bumps. A miss records
//! the epoch before querying the store and only publishes its answer if the
//! epoch is unchanged, so a read that overlaps a mutation can never
//! resurrect the pre-mutation value.

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::metrics;
use crate::store::{Store, bounded};
use crate::types::{Actor, Scope};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

type CacheKey = (Scope, Actor);

/// A cached boolean with its own expiry.
#[derive(Debug, Clone, Copy)]
struct CacheEntry<T> {
    value: T,
    expires_at_ms: i64,
}

impl<T> CacheEntry<T> {
    fn is_live(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }
}

/// One predicate's table plus its invalidation epoch.
#[derive(Debug, Default)]
struct Table {
    entries: DashMap<CacheKey, CacheEntry<bool>>,
    epoch: AtomicU64,
}

impl Table {
    fn live(&self, key: &CacheKey, now_ms: i64) -> Option<bool> {
        self.entries
            .get(key)
            .filter(|e| e.is_live(now_ms))
            .map(|e| e.value)
    }

    fn last_known(&self, key: &CacheKey) -> Option<bool> {
        self.entries.get(key).map(|e| e.value)
    }

    /// Publish `value` unless an invalidation happened since `seen_epoch`.
    fn publish(&self, key: CacheKey, value: bool, expires_at_ms: i64, seen_epoch: u64) {
        // The shard lock is held from the epoch check to the insert, and
        // `invalidate` bumps the epoch before taking the same lock to remove.
        let entry = self.entries.entry(key);
        if self.epoch.load(Ordering::SeqCst) == seen_epoch {
            entry.insert(CacheEntry {
                value,
                expires_at_ms,
            });
        }
    }

    fn invalidate(&self, key: &CacheKey) -> bool {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.remove(key).is_some()
    }

    fn sweep(&self, now_ms: i64) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_live(now_ms) {
                true
            } else {
                removed += 1;
                false
            }
        });
        removed
    }
}

/// Permission cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub admin_entries: usize,
    pub silence_entries: usize,
}

/// Read-through, TTL-bounded shadow of `is_group_admin` and `is_silenced`.
pub struct PermissionCache {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    admin: Table,
    silence: Table,
    admin_ttl_ms: i64,
    silence_ttl_ms: i64,
    store_timeout: Duration,
    silence_fail_closed: bool,
}

impl PermissionCache {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        config: &CacheConfig,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            admin: Table::default(),
            silence: Table::default(),
            admin_ttl_ms: i64::try_from(config.admin_ttl().as_millis()).unwrap_or(i64::MAX),
            silence_ttl_ms: i64::try_from(config.silence_ttl().as_millis()).unwrap_or(i64::MAX),
            store_timeout,
            silence_fail_closed: config.silence_fail_closed,
        }
    }

    /// Whether `actor` holds an admin grant in `scope`.
    pub async fn is_group_admin(&self, scope: &Scope, actor: &Actor) -> bool {
        let key = (scope.clone(), actor.clone());
        let now_ms = self.clock.now_ms();

        if let Some(value) = self.admin.live(&key, now_ms) {
            metrics::record_cache_lookup("admin", "hit");
            return value;
        }

        let seen_epoch = self.admin.epoch.load(Ordering::SeqCst);
        let scope_key = scope.key();
        let lookup = self.store.find_admin_grant(&scope_key, actor);
        match bounded(self.store_timeout, lookup).await {
            Ok(value) => {
                metrics::record_cache_lookup("admin", "miss");
                let expires_at_ms = now_ms.saturating_add(self.admin_ttl_ms);
                self.admin.publish(key, value, expires_at_ms, seen_epoch);
                value
            }
            Err(e) => {
                metrics::record_cache_lookup("admin", "error");
                metrics::record_store_error("find_admin_grant");
                warn!(scope = %scope, actor = %actor, error = %e, "Admin lookup failed, treating as not admin");
                false
            }
        }
    }

    /// Whether `actor`'s messages in `scope` must be suppressed.
    pub async fn is_silenced(&self, scope: &Scope, actor: &Actor) -> bool {
        let key = (scope.clone(), actor.clone());
        let now_ms = self.clock.now_ms();

        if let Some(value) = self.silence.live(&key, now_ms) {
            metrics::record_cache_lookup("silence", "hit");
            return value;
        }

        let now_secs = now_ms.div_euclid(1000);
        let seen_epoch = self.silence.epoch.load(Ordering::SeqCst);
        let scope_key = scope.key();
        let lookup = self.store.find_silence_record(&scope_key, actor, now_secs);
        match bounded(self.store_timeout, lookup).await {
            Ok(record) => {
                metrics::record_cache_lookup("silence", "miss");
                let live = record.filter(|r| !r.is_expired(now_secs));
                let mut expires_at_ms = now_ms.saturating_add(self.silence_ttl_ms);
                // Never let the cache outlive the silence itself.
                if let Some(ends) = live.as_ref().and_then(|r| r.expires_at) {
                    expires_at_ms = expires_at_ms.min(ends.saturating_add(1).saturating_mul(1000));
                }
                let value = live.is_some();
                self.silence.publish(key, value, expires_at_ms, seen_epoch);
                value
            }
            Err(e) => {
                metrics::record_cache_lookup("silence", "error");
                metrics::record_store_error("find_silence_record");
                let fallback = self
                    .silence
                    .last_known(&key)
                    .unwrap_or(self.silence_fail_closed);
                warn!(
                    scope = %scope,
                    actor = %actor,
                    error = %e,
                    silenced = fallback,
                    "Silence lookup failed, using fallback"
                );
                fallback
            }
        }
    }

    /// Drop the cached admin flag for (scope, actor). No-op if absent.
    pub fn invalidate_admin(&self, scope: &Scope, actor: &Actor) {
        let key = (scope.clone(), actor.clone());
        if self.admin.invalidate(&key) {
            debug!(scope = %scope, actor = %actor, "Invalidated cached admin flag");
        }
    }

    /// Drop the cached silence flag for (scope, actor). No-op if absent.
    pub fn invalidate_silence(&self, scope: &Scope, actor: &Actor) {
        let key = (scope.clone(), actor.clone());
        if self.silence.invalidate(&key) {
            debug!(scope = %scope, actor = %actor, "Invalidated cached silence flag");
        }
    }

    /// Remove expired entries from both tables.
    ///
    /// Purely a memory bound: lookups already ignore expired entries.
    pub fn sweep(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let removed = self.admin.sweep(now_ms) + self.silence.sweep(now_ms);
        if removed > 0 {
            debug!(count = removed, "Swept expired permission cache entries");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            admin_entries: self.admin.entries.len(),
            silence_entries: self.silence.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::{AdminGrant, SilenceRecord};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        cache: PermissionCache,
    }

    fn fixture(silence_fail_closed: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let config = CacheConfig {
            admin_ttl_secs: 300,
            silence_ttl_secs: 30,
            sweep_interval_secs: 60,
            silence_fail_closed,
        };
        let cache = PermissionCache::new(
            store.clone(),
            clock.clone(),
            &config,
            Duration::from_millis(100),
        );
        Fixture {
            store,
            clock,
            cache,
        }
    }

    fn g1() -> Scope {
        Scope::group("g1")
    }

    fn grant(scope: &Scope, actor: &str) -> AdminGrant {
        AdminGrant {
            scope: scope.key(),
            actor: actor.into(),
            granted_by: "owner".into(),
            granted_at: 0,
        }
    }

    fn silence(scope: &Scope, actor: &str, expires_at: Option<i64>) -> SilenceRecord {
        SilenceRecord {
            scope: scope.key(),
            actor: actor.into(),
            silenced_by: "mod".into(),
            created_at: 0,
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_admin_read_through_and_hit() {
        let f = fixture(true);
        let alice = Actor::new("alice");
        f.store.put_admin_grant(&grant(&g1(), "alice")).await.unwrap();

        assert!(f.cache.is_group_admin(&g1(), &alice).await);
        assert!(f.cache.is_group_admin(&g1(), &alice).await);
        assert_eq!(f.store.admin_queries(), 1);
    }

    #[tokio::test]
    async fn test_admin_stale_until_ttl_without_invalidation() {
        let f = fixture(true);
        let alice = Actor::new("alice");
        f.store.put_admin_grant(&grant(&g1(), "alice")).await.unwrap();
        assert!(f.cache.is_group_admin(&g1(), &alice).await);

        // Bypass the mutation boundary: the cache keeps its shadow until TTL.
        f.store.delete_admin_grant(&g1().key(), &alice).await.unwrap();
        f.clock.advance(Duration::from_secs(299));
        assert!(f.cache.is_group_admin(&g1(), &alice).await);

        f.clock.advance(Duration::from_secs(1));
        assert!(!f.cache.is_group_admin(&g1(), &alice).await);
    }

    #[tokio::test]
    async fn test_invalidate_admin_forces_fresh_read() {
        let f = fixture(true);
        let alice = Actor::new("alice");
        assert!(!f.cache.is_group_admin(&g1(), &alice).await);

        f.store.put_admin_grant(&grant(&g1(), "alice")).await.unwrap();
        f.cache.invalidate_admin(&g1(), &alice);
        assert!(f.cache.is_group_admin(&g1(), &alice).await);
    }

    #[tokio::test]
    async fn test_invalidate_missing_entry_is_noop() {
        let f = fixture(true);
        let ghost = Actor::new("ghost");
        let nowhere = Scope::direct("nowhere");
        f.cache.invalidate_admin(&nowhere, &ghost);
        f.cache.invalidate_silence(&nowhere, &ghost);
        assert_eq!(
            f.cache.stats(),
            CacheStats {
                admin_entries: 0,
                silence_entries: 0
            }
        );
    }

    #[tokio::test]
    async fn test_admin_fails_closed_and_is_not_cached() {
        let f = fixture(true);
        let alice = Actor::new("alice");
        f.store.put_admin_grant(&grant(&g1(), "alice")).await.unwrap();
        f.store.set_unavailable(true);

        assert!(!f.cache.is_group_admin(&g1(), &alice).await);
        assert_eq!(f.cache.stats().admin_entries, 0);

        f.store.set_unavailable(false);
        assert!(f.cache.is_group_admin(&g1(), &alice).await);
    }

    #[tokio::test]
    async fn test_admin_timeout_fails_closed() {
        let f = fixture(true);
        let alice = Actor::new("alice");
        f.store.put_admin_grant(&grant(&g1(), "alice")).await.unwrap();
        f.store.set_latency(Some(Duration::from_millis(500)));

        assert!(!f.cache.is_group_admin(&g1(), &alice).await);
    }

    #[tokio::test]
    async fn test_silence_ttl_shorter_and_capped_by_record_expiry() {
        let f = fixture(true);
        let bob = Actor::new("bob");
        let now = f.clock.now_secs();
        f.store
            .put_silence_record(&silence(&g1(), "bob", Some(now + 10)))
            .await
            .unwrap();

        assert!(f.cache.is_silenced(&g1(), &bob).await);
        f.clock.advance(Duration::from_secs(10));
        assert!(f.cache.is_silenced(&g1(), &bob).await);
        assert_eq!(f.store.silence_queries(), 1);

        // The cached flag ends with the silence, well before the 30s TTL.
        f.clock.advance(Duration::from_secs(1));
        assert!(!f.cache.is_silenced(&g1(), &bob).await);
        assert_eq!(f.store.silence_queries(), 2);
    }

    #[tokio::test]
    async fn test_silence_failure_uses_stale_value() {
        let f = fixture(false);
        let bob = Actor::new("bob");
        f.store
            .put_silence_record(&silence(&g1(), "bob", None))
            .await
            .unwrap();
        assert!(f.cache.is_silenced(&g1(), &bob).await);

        f.clock.advance(Duration::from_secs(31));
        f.store.set_unavailable(true);
        assert!(f.cache.is_silenced(&g1(), &bob).await);
    }

    #[tokio::test]
    async fn test_silence_failure_without_cache_uses_policy() {
        let closed = fixture(true);
        closed.store.set_unavailable(true);
        assert!(closed.cache.is_silenced(&g1(), &Actor::new("carol")).await);

        let open = fixture(false);
        open.store.set_unavailable(true);
        assert!(!open.cache.is_silenced(&g1(), &Actor::new("carol")).await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let f = fixture(true);
        let alice = Actor::new("alice");
        f.cache.is_group_admin(&g1(), &alice).await;
        f.cache.is_silenced(&g1(), &alice).await;

        f.clock.advance(Duration::from_secs(31));
        assert_eq!(f.cache.sweep(), 1);
        assert_eq!(
            f.cache.stats(),
            CacheStats {
                admin_entries: 1,
                silence_entries: 0
            }
        );
    }

    #[tokio::test]
    async fn test_read_overlapping_invalidation_is_not_published() {
        let f = fixture(true);
        let alice = Actor::new("alice");
        let key = (g1(), alice.clone());

        let seen = f.cache.admin.epoch.load(Ordering::SeqCst);
        f.cache.invalidate_admin(&g1(), &alice);
        f.cache.admin.publish(key, true, i64::MAX, seen);

        assert_eq!(f.cache.stats().admin_entries, 0);
    }

    #[tokio::test]
    async fn test_group_and_direct_with_same_id_are_separate() {
        let f = fixture(false);
        let alice = Actor::new("alice");
        let dm = Scope::direct("g1");
        f.store.put_admin_grant(&grant(&g1(), "alice")).await.unwrap();
        f.store
            .put_silence_record(&silence(&dm, "alice", None))
            .await
            .unwrap();

        assert!(f.cache.is_group_admin(&g1(), &alice).await);
        assert!(!f.cache.is_group_admin(&dm, &alice).await);
        assert!(f.cache.is_silenced(&dm, &alice).await);
        assert!(!f.cache.is_silenced(&g1(), &alice).await);
    }

    #[tokio::test]
    async fn test_far_future_silence_does_not_overflow() {
        let f = fixture(true);
        let bob = Actor::new("bob");
        f.store
            .put_silence_record(&silence(&g1(), "bob", Some(i64::MAX)))
            .await
            .unwrap();

        assert!(f.cache.is_silenced(&g1(), &bob).await);
        f.clock.advance(Duration::from_secs(31));
        assert!(f.cache.is_silenced(&g1(), &bob).await);
    }
}
