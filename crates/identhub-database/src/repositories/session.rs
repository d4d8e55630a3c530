use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use identhub_core::error::{AppError, ErrorKind};
use identhub_core::AppResult;
use identhub_entity::session::{Session, SessionWithUser};

use crate::stores::SessionStore;

/// PostgreSQL repository for device sessions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn insert(&self, session: &Session) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                id, user_id, tenant_id, refresh_token_hash, ip_address, user_agent,
                device_type, browser, operating_system, created_at, last_activity_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.tenant_id)
        .bind(&session.refresh_token_hash)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.device_type)
        .bind(&session.browser)
        .bind(&session.operating_system)
        .bind(session.created_at)
        .bind(session.last_activity_at)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create session", e))
    }

    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find session by id", e)
            })
    }

    async fn find_by_refresh_token_hash(
        &self,
        tenant_id: &str,
        hash: &str,
    ) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE tenant_id = $1 AND refresh_token_hash = $2",
        )
        .bind(tenant_id)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to find session by refresh token",
                e,
            )
        })
    }

    async fn find_active_by_user(
        &self,
        tenant_id: &str,
        user_id: Uuid,
    ) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE tenant_id = $1 AND user_id = $2 AND NOT revoked AND expires_at > NOW()
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sessions", e))
    }

    async fn find_active_by_user_with_identity(
        &self,
        tenant_id: &str,
        user_id: Uuid,
    ) -> AppResult<Vec<SessionWithUser>> {
        sqlx::query_as::<_, SessionWithUser>(
            r#"
            SELECT s.*, u.email AS user_email, u.display_name AS user_display_name
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.tenant_id = $1 AND s.user_id = $2 AND NOT s.revoked AND s.expires_at > NOW()
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list sessions with identity", e)
        })
    }

    async fn touch_by_refresh_token_hash(&self, tenant_id: &str, hash: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET last_activity_at = NOW()
            WHERE tenant_id = $1 AND refresh_token_hash = $2 AND NOT revoked
            "#,
        )
        .bind(tenant_id)
        .bind(hash)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch session", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke(
        &self,
        tenant_id: &str,
        id: Uuid,
        revoked_by: Uuid,
        reason: &str,
        revoked_tenant_id: &str,
    ) -> AppResult<bool> {
        // The NOT revoked guard makes repeated revocation a no-op instead of
        // overwriting the original audit fields.
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET revoked = TRUE, revoked_at = NOW(), revoked_by = $3,
                revoked_reason = $4, revoked_tenant_id = $5
            WHERE tenant_id = $1 AND id = $2 AND NOT revoked
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(revoked_by)
        .bind(reason)
        .bind(revoked_tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke session", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(
        &self,
        tenant_id: &str,
        user_id: Uuid,
        revoked_by: Uuid,
        except: Option<Uuid>,
        reason: &str,
        revoked_tenant_id: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET revoked = TRUE, revoked_at = NOW(), revoked_by = $3,
                revoked_reason = $4, revoked_tenant_id = $5
            WHERE tenant_id = $1 AND user_id = $2 AND NOT revoked AND expires_at > NOW()
              AND ($6::uuid IS NULL OR id != $6)
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(revoked_by)
        .bind(reason)
        .bind(revoked_tenant_id)
        .bind(except)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to revoke user sessions", e)
        })?;

        Ok(result.rows_affected())
    }

    async fn rotate_refresh_binding(
        &self,
        user_id: Uuid,
        old_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let user_rows = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $2, refresh_token_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(new_hash)
        .bind(new_expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rotate refresh token", e)
        })?;

        if user_rows.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(AppError::not_found(format!("User {user_id} not found")));
        }

        // A session may no longer exist for this hash (e.g. already purged);
        // zero rows here is fine.
        sqlx::query(
            r#"
            UPDATE sessions
            SET refresh_token_hash = $2, expires_at = $3, last_activity_at = NOW()
            WHERE refresh_token_hash = $1 AND NOT revoked
            "#,
        )
        .bind(old_hash)
        .bind(new_hash)
        .bind(new_expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rebind session token", e)
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit rotation", e)
        })?;
        Ok(())
    }

    async fn purge_expired_before(
        &self,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM sessions WHERE expires_at < $1 AND expires_at < $2")
                .bind(now)
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to purge sessions", e)
                })?;

        Ok(result.rows_affected())
    }
}
