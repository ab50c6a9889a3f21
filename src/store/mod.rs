//! Durable store contract consumed by the admission pipeline.
//!
//! The pipeline only needs a handful of point queries and mutations, so it
//! talks to the store through the narrow [`Store`] trait rather than through
//! [`Database`] directly. [`MemoryStore`] implements the same contract for
//! tests and for running without a database file.

mod memory;

pub use memory::MemoryStore;

use crate::db::{AdminGrant, AuditRecord, Database, DbError, SilenceRecord, SpecialPermission};
use crate::types::Actor;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Point queries and mutations over grants, permissions, silences and audit.
#[async_trait]
pub trait Store: Send + Sync {
    /// Whether `actor` holds an admin grant in `scope`.
    async fn find_admin_grant(&self, scope: &str, actor: &Actor) -> Result<bool, DbError>;

    /// The override for (scope, actor, command), expired or not.
    async fn find_special_permission(
        &self,
        scope: &str,
        actor: &Actor,
        command: &str,
    ) -> Result<Option<SpecialPermission>, DbError>;

    /// The silence for (scope, actor). Implementations may drop records that
    /// expired before `now` and report them as absent.
    async fn find_silence_record(
        &self,
        scope: &str,
        actor: &Actor,
        now: i64,
    ) -> Result<Option<SilenceRecord>, DbError>;

    /// Append an audit record.
    async fn append_audit(&self, record: &AuditRecord) -> Result<(), DbError>;

    async fn put_admin_grant(&self, grant: &AdminGrant) -> Result<(), DbError>;

    async fn delete_admin_grant(&self, scope: &str, actor: &Actor) -> Result<bool, DbError>;

    async fn put_special_permission(&self, perm: &SpecialPermission) -> Result<(), DbError>;

    async fn delete_special_permission(
        &self,
        scope: &str,
        actor: &Actor,
        command: &str,
    ) -> Result<bool, DbError>;

    async fn put_silence_record(&self, record: &SilenceRecord) -> Result<(), DbError>;

    async fn delete_silence_record(&self, scope: &str, actor: &Actor) -> Result<bool, DbError>;

    /// Delete every silence that lapsed before `now`; returns how many.
    async fn purge_expired_silences(&self, now: i64) -> Result<u64, DbError>;
}

#[async_trait]
impl Store for Database {
    async fn find_admin_grant(&self, scope: &str, actor: &Actor) -> Result<bool, DbError> {
        self.grants().has_admin(scope, actor.as_str()).await
    }

    async fn find_special_permission(
        &self,
        scope: &str,
        actor: &Actor,
        command: &str,
    ) -> Result<Option<SpecialPermission>, DbError> {
        self.grants()
            .find_special(scope, actor.as_str(), command)
            .await
    }

    async fn find_silence_record(
        &self,
        scope: &str,
        actor: &Actor,
        now: i64,
    ) -> Result<Option<SilenceRecord>, DbError> {
        self.silences().find_active(scope, actor.as_str(), now).await
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), DbError> {
        self.audit().append(record).await
    }

    async fn put_admin_grant(&self, grant: &AdminGrant) -> Result<(), DbError> {
        self.grants().upsert_admin(grant).await
    }

    async fn delete_admin_grant(&self, scope: &str, actor: &Actor) -> Result<bool, DbError> {
        self.grants().delete_admin(scope, actor.as_str()).await
    }

    async fn put_special_permission(&self, perm: &SpecialPermission) -> Result<(), DbError> {
        self.grants().upsert_special(perm).await
    }

    async fn delete_special_permission(
        &self,
        scope: &str,
        actor: &Actor,
        command: &str,
    ) -> Result<bool, DbError> {
        self.grants()
            .delete_special(scope, actor.as_str(), command)
            .await
    }

    async fn put_silence_record(&self, record: &SilenceRecord) -> Result<(), DbError> {
        self.silences().upsert(record).await
    }

    async fn delete_silence_record(&self, scope: &str, actor: &Actor) -> Result<bool, DbError> {
        self.silences().delete(scope, actor.as_str()).await
    }

    async fn purge_expired_silences(&self, now: i64) -> Result<u64, DbError> {
        self.silences().purge_expired(now).await
    }
}

/// Run a store call with an upper bound on how long it may take.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, DbError>
where
    F: Future<Output = Result<T, DbError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(DbError::Timeout(limit)),
    }
}
