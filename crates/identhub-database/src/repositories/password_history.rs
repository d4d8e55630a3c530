use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use identhub_core::error::{AppError, ErrorKind};
use identhub_core::AppResult;
use identhub_entity::password_history::PasswordHistoryEntry;

use crate::stores::PasswordHistoryStore;

/// PostgreSQL repository for the password history ring.
#[derive(Debug, Clone)]
pub struct PasswordHistoryRepository {
    pool: PgPool,
}

impl PasswordHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordHistoryStore for PasswordHistoryRepository {
    async fn recent(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<PasswordHistoryEntry>> {
        sqlx::query_as::<_, PasswordHistoryEntry>(
            r#"
            SELECT * FROM password_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load password history", e)
        })
    }

    async fn append(&self, entry: &PasswordHistoryEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO password_history (id, user_id, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.password_hash)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record password history", e)
        })?;
        Ok(())
    }

    async fn prune(&self, user_id: Uuid, keep: u32) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_history
            WHERE user_id = $1 AND id NOT IN (
                SELECT id FROM password_history
                WHERE user_id = $1
                ORDER BY created_at DESC
                LIMIT $2
            )
            "#,
        )
        .bind(user_id)
        .bind(keep as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to prune password history", e)
        })?;

        Ok(result.rows_affected())
    }
}
