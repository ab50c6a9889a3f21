//! Audit log queries.
//!
//! The log is append-only from the pipeline's point of view; retention is a
//! housekeeping concern outside this crate.

use super::DbError;
use super::models::AuditRecord;
use crate::types::Actor;
use sqlx::SqlitePool;

type AuditRow = (String, String, String, String, String, bool, Option<String>, i64);

/// Repository for the audit log.
pub struct AuditRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a record.
    pub async fn append(&self, record: &AuditRecord) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log
                (id, actor, scope, command, arguments_redacted, success, reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.actor.as_str())
        .bind(&record.scope)
        .bind(&record.command)
        .bind(&record.arguments_redacted)
        .bind(record.success)
        .bind(record.reason.as_deref())
        .bind(record.timestamp)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Most recent records, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditRecord>, DbError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, actor, scope, command, arguments_redacted, success, reason, created_at
            FROM audit_log
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(into_record).collect())
    }

    /// Most recent records for one actor, newest first.
    pub async fn for_actor(&self, actor: &str, limit: i64) -> Result<Vec<AuditRecord>, DbError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, actor, scope, command, arguments_redacted, success, reason, created_at
            FROM audit_log
            WHERE actor = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(actor)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(into_record).collect())
    }
}

fn into_record(row: AuditRow) -> AuditRecord {
    let (id, actor, scope, command, arguments_redacted, success, reason, timestamp) = row;
    AuditRecord {
        id,
        actor: Actor::new(actor),
        scope,
        command,
        arguments_redacted,
        success,
        reason,
        timestamp,
    }
}
