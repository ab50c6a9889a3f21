//! Admin grant and special permission queries.

use super::DbError;
use super::models::{AdminGrant, SpecialPermission};
use crate::types::Actor;
use sqlx::SqlitePool;

/// Repository for admin grants and per-command overrides.
pub struct GrantRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GrantRepository<'a> {
    /// Create a new grant repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Check whether `actor` holds an admin grant in `scope`.
    pub async fn has_admin(&self, scope: &str, actor: &str) -> Result<bool, DbError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM admin_grants WHERE scope = ? AND actor = ?",
        )
        .bind(scope)
        .bind(actor)
        .fetch_optional(self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Insert or replace an admin grant.
    pub async fn upsert_admin(&self, grant: &AdminGrant) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO admin_grants (scope, actor, granted_by, granted_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&grant.scope)
        .bind(grant.actor.as_str())
        .bind(grant.granted_by.as_str())
        .bind(grant.granted_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove an admin grant. Returns whether a row was deleted.
    pub async fn delete_admin(&self, scope: &str, actor: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM admin_grants WHERE scope = ? AND actor = ?")
            .bind(scope)
            .bind(actor)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List the admins of a scope, oldest grant first.
    pub async fn list_admins(&self, scope: &str) -> Result<Vec<AdminGrant>, DbError> {
        let rows = sqlx::query_as::<_, (String, String, String, i64)>(
            r#"
            SELECT scope, actor, granted_by, granted_at
            FROM admin_grants
            WHERE scope = ?
            ORDER BY granted_at ASC
            "#,
        )
        .bind(scope)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(scope, actor, granted_by, granted_at)| AdminGrant {
                scope,
                actor: Actor::new(actor),
                granted_by: Actor::new(granted_by),
                granted_at,
            })
            .collect())
    }

    /// Find the override for (scope, actor, command), expired or not.
    pub async fn find_special(
        &self,
        scope: &str,
        actor: &str,
        command: &str,
    ) -> Result<Option<SpecialPermission>, DbError> {
        let row = sqlx::query_as::<_, (String, String, String, bool, String, i64, Option<i64>)>(
            r#"
            SELECT scope, actor, command, allowed, granted_by, granted_at, expires_at
            FROM special_permissions
            WHERE scope = ? AND actor = ? AND command = ?
            "#,
        )
        .bind(scope)
        .bind(actor)
        .bind(command)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(
            |(scope, actor, command, allowed, granted_by, granted_at, expires_at)| {
                SpecialPermission {
                    scope,
                    actor: Actor::new(actor),
                    command,
                    allowed,
                    granted_by: Actor::new(granted_by),
                    granted_at,
                    expires_at,
                }
            },
        ))
    }

    /// Insert or replace a special permission.
    pub async fn upsert_special(&self, perm: &SpecialPermission) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO special_permissions
                (scope, actor, command, allowed, granted_by, granted_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&perm.scope)
        .bind(perm.actor.as_str())
        .bind(&perm.command)
        .bind(perm.allowed)
        .bind(perm.granted_by.as_str())
        .bind(perm.granted_at)
        .bind(perm.expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove a special permission. Returns whether a row was deleted.
    pub async fn delete_special(
        &self,
        scope: &str,
        actor: &str,
        command: &str,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "DELETE FROM special_permissions WHERE scope = ? AND actor = ? AND command = ?",
        )
        .bind(scope)
        .bind(actor)
        .bind(command)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
