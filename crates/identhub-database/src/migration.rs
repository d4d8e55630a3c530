use tracing::info;

use identhub_core::error::{AppError, ErrorKind};
use identhub_core::AppResult;

use crate::connection::DatabasePool;

/// Applies all pending migrations from the workspace `migrations/` directory.
pub async fn run_migrations(db: &DatabasePool) -> AppResult<()> {
    info!("Running database migrations");

    sqlx::migrate!("../../migrations")
        .run(db.pool())
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to run migrations", e))?;

    info!("Database migrations complete");
    Ok(())
}
