//! Silence record queries.

use super::DbError;
use super::models::SilenceRecord;
use crate::types::Actor;
use sqlx::SqlitePool;

/// Repository for silence records.
pub struct SilenceRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SilenceRepository<'a> {
    /// Create a new silence repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the live silence for (scope, actor).
    ///
    /// A record whose expiry is before `now` is deleted on the way out and
    /// reported as absent.
    pub async fn find_active(
        &self,
        scope: &str,
        actor: &str,
        now: i64,
    ) -> Result<Option<SilenceRecord>, DbError> {
        let row = sqlx::query_as::<_, (String, String, String, i64, Option<i64>)>(
            r#"
            SELECT scope, actor, silenced_by, created_at, expires_at
            FROM silences
            WHERE scope = ? AND actor = ?
            "#,
        )
        .bind(scope)
        .bind(actor)
        .fetch_optional(self.pool)
        .await?;

        let Some((scope, actor, silenced_by, created_at, expires_at)) = row else {
            return Ok(None);
        };

        let record = SilenceRecord {
            scope,
            actor: Actor::new(actor),
            silenced_by: Actor::new(silenced_by),
            created_at,
            expires_at,
        };

        if record.is_expired(now) {
            self.delete(&record.scope, record.actor.as_str()).await?;
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Insert or replace a silence.
    pub async fn upsert(&self, record: &SilenceRecord) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO silences (scope, actor, silenced_by, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.scope)
        .bind(record.actor.as_str())
        .bind(record.silenced_by.as_str())
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove a silence. Returns whether a row was deleted.
    pub async fn delete(&self, scope: &str, actor: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM silences WHERE scope = ? AND actor = ?")
            .bind(scope)
            .bind(actor)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every silence that expired before `now`.
    pub async fn purge_expired(&self, now: i64) -> Result<u64, DbError> {
        let result =
            sqlx::query("DELETE FROM silences WHERE expires_at IS NOT NULL AND expires_at < ?")
                .bind(now)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
