use async_trait::async_trait;
use sqlx::postgres::PgPool;

use identhub_core::error::{AppError, ErrorKind};
use identhub_core::AppResult;
use identhub_entity::tenant::Tenant;

use crate::stores::TenantDirectory;

/// PostgreSQL repository for tenant records.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDirectory for TenantRepository {
    async fn lookup(&self, tenant_id: &str) -> AppResult<Option<Tenant>> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find tenant", e))
    }
}
