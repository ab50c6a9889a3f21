//! In-memory [`Store`] with failure injection.

use super::Store;
use crate::db::{AdminGrant, AuditRecord, DbError, SilenceRecord, SpecialPermission};
use crate::types::Actor;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

type PairKey = (String, Actor);
type PermKey = (String, Actor, String);

/// Store that keeps everything in process memory.
///
/// Besides backing tests, it can simulate an outage (`set_unavailable`), a
/// slow backend (`set_latency`) or writes that land but report failure
/// (`set_lost_acks`), and counts read queries so callers can tell
/// cache hits from misses.
#[derive(Debug, Default)]
pub struct MemoryStore {
    admins: DashMap<PairKey, AdminGrant>,
    specials: DashMap<PermKey, SpecialPermission>,
    silences: DashMap<PairKey, SilenceRecord>,
    audit: Mutex<Vec<AuditRecord>>,
    unavailable: AtomicBool,
    lost_acks: AtomicBool,
    latency: Mutex<Option<Duration>>,
    admin_queries: AtomicU64,
    silence_queries: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`DbError::Unavailable`].
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Apply every mutation but report it as failed.
    pub fn set_lost_acks(&self, lost: bool) {
        self.lost_acks.store(lost, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Number of admin lookups served so far.
    pub fn admin_queries(&self) -> u64 {
        self.admin_queries.load(Ordering::SeqCst)
    }

    /// Number of silence lookups served so far.
    pub fn silence_queries(&self) -> u64 {
        self.silence_queries.load(Ordering::SeqCst)
    }

    /// Snapshot of the audit trail in append order.
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.lock().clone()
    }

    async fn gate(&self) -> Result<(), DbError> {
        let latency = *self.latency.lock();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    fn ack(&self) -> Result<(), DbError> {
        if self.lost_acks.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("write acknowledgement lost".into()));
        }
        Ok(())
    }
}

fn pair(scope: &str, actor: &Actor) -> PairKey {
    (scope.to_string(), actor.clone())
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_admin_grant(&self, scope: &str, actor: &Actor) -> Result<bool, DbError> {
        self.admin_queries.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        Ok(self.admins.contains_key(&pair(scope, actor)))
    }

    async fn find_special_permission(
        &self,
        scope: &str,
        actor: &Actor,
        command: &str,
    ) -> Result<Option<SpecialPermission>, DbError> {
        self.gate().await?;
        let key = (scope.to_string(), actor.clone(), command.to_string());
        Ok(self.specials.get(&key).map(|p| p.value().clone()))
    }

    async fn find_silence_record(
        &self,
        scope: &str,
        actor: &Actor,
        now: i64,
    ) -> Result<Option<SilenceRecord>, DbError> {
        self.silence_queries.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        let key = pair(scope, actor);
        // Lazy expiry: a lapsed record is dropped on read.
        self.silences.remove_if(&key, |_, record| record.is_expired(now));
        Ok(self.silences.get(&key).map(|r| r.value().clone()))
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), DbError> {
        self.gate().await?;
        self.audit.lock().push(record.clone());
        Ok(())
    }

    async fn put_admin_grant(&self, grant: &AdminGrant) -> Result<(), DbError> {
        self.gate().await?;
        self.admins
            .insert(pair(&grant.scope, &grant.actor), grant.clone());
        self.ack()
    }

    async fn delete_admin_grant(&self, scope: &str, actor: &Actor) -> Result<bool, DbError> {
        self.gate().await?;
        let existed = self.admins.remove(&pair(scope, actor)).is_some();
        self.ack()?;
        Ok(existed)
    }

    async fn put_special_permission(&self, perm: &SpecialPermission) -> Result<(), DbError> {
        self.gate().await?;
        let key = (perm.scope.clone(), perm.actor.clone(), perm.command.clone());
        self.specials.insert(key, perm.clone());
        self.ack()
    }

    async fn delete_special_permission(
        &self,
        scope: &str,
        actor: &Actor,
        command: &str,
    ) -> Result<bool, DbError> {
        self.gate().await?;
        let key = (scope.to_string(), actor.clone(), command.to_string());
        let existed = self.specials.remove(&key).is_some();
        self.ack()?;
        Ok(existed)
    }

    async fn put_silence_record(&self, record: &SilenceRecord) -> Result<(), DbError> {
        self.gate().await?;
        self.silences
            .insert(pair(&record.scope, &record.actor), record.clone());
        self.ack()
    }

    async fn delete_silence_record(&self, scope: &str, actor: &Actor) -> Result<bool, DbError> {
        self.gate().await?;
        let existed = self.silences.remove(&pair(scope, actor)).is_some();
        self.ack()?;
        Ok(existed)
    }

    async fn purge_expired_silences(&self, now: i64) -> Result<u64, DbError> {
        self.gate().await?;
        let before = self.silences.len();
        self.silences.retain(|_, record| !record.is_expired(now));
        Ok(before.saturating_sub(self.silences.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outage_fails_every_call() {
        let store = MemoryStore::new();
        let alice = Actor::new("alice");
        store.set_unavailable(true);

        assert!(matches!(
            store.find_admin_grant("g1", &alice).await,
            Err(DbError::Unavailable(_))
        ));
        assert!(store.find_silence_record("g1", &alice, 0).await.is_err());

        store.set_unavailable(false);
        assert!(!store.find_admin_grant("g1", &alice).await.unwrap());
        assert_eq!(store.admin_queries(), 2);
    }

    #[tokio::test]
    async fn test_expired_silence_dropped_on_read() {
        let store = MemoryStore::new();
        let bob = Actor::new("bob");
        store
            .put_silence_record(&SilenceRecord {
                scope: "g1".into(),
                actor: bob.clone(),
                silenced_by: Actor::new("mod"),
                created_at: 0,
                expires_at: Some(10),
            })
            .await
            .unwrap();

        assert!(store.find_silence_record("g1", &bob, 5).await.unwrap().is_some());
        assert!(store.find_silence_record("g1", &bob, 11).await.unwrap().is_none());
        assert!(!store.delete_silence_record("g1", &bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_lost_ack_still_applies_write() {
        let store = MemoryStore::new();
        let alice = Actor::new("alice");
        store.set_lost_acks(true);

        let grant = AdminGrant {
            scope: "group:g1".into(),
            actor: alice.clone(),
            granted_by: Actor::new("owner"),
            granted_at: 0,
        };
        assert!(store.put_admin_grant(&grant).await.is_err());
        assert!(store.find_admin_grant("group:g1", &alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_drops_only_lapsed_silences() {
        let store = MemoryStore::new();
        for (actor, expires_at) in [("a", Some(10)), ("b", Some(100)), ("c", None)] {
            store
                .put_silence_record(&SilenceRecord {
                    scope: "group:g1".into(),
                    actor: Actor::new(actor),
                    silenced_by: Actor::new("mod"),
                    created_at: 0,
                    expires_at,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.purge_expired_silences(50).await.unwrap(), 1);
        assert_eq!(store.purge_expired_silences(50).await.unwrap(), 0);
        assert!(!store.delete_silence_record("group:g1", &Actor::new("a")).await.unwrap());
        assert!(store.delete_silence_record("group:g1", &Actor::new("c")).await.unwrap());
    }
}
