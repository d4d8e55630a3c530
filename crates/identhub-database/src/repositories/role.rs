use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use identhub_core::error::{AppError, ErrorKind};
use identhub_core::AppResult;

use crate::stores::RoleStore;

/// PostgreSQL repository for role and group-role assignments.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for RoleRepository {
    async fn direct_roles(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT role_name FROM user_roles WHERE user_id = $1 ORDER BY role_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load user roles", e))
    }

    async fn group_roles(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT gr.role_name
            FROM group_roles gr
            JOIN user_groups ug ON ug.group_id = gr.group_id
            WHERE ug.user_id = $1
            ORDER BY gr.role_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load group roles", e))
    }

    async fn assign_role(&self, user_id: Uuid, role: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_name) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to assign role", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_role(&self, user_id: Uuid, role: &str) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_name = $2")
                .bind(user_id)
                .bind(role)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to remove role", e)
                })?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_active_role_holders(&self, tenant_id: &str, role: &str) -> AppResult<u64> {
        // Counts both direct assignments and group-inherited grants, since a
        // user holds a role either way.
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT u.id)
            FROM users u
            WHERE u.tenant_id = $1 AND u.active
              AND (
                EXISTS (
                    SELECT 1 FROM user_roles ur
                    WHERE ur.user_id = u.id AND ur.role_name = $2
                )
                OR EXISTS (
                    SELECT 1 FROM user_groups ug
                    JOIN group_roles gr ON gr.group_id = ug.group_id
                    WHERE ug.user_id = u.id AND gr.role_name = $2
                )
              )
            "#,
        )
        .bind(tenant_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count role holders", e)
        })?;

        Ok(count as u64)
    }
}
