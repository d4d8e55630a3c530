//! IdentHub Maintenance Daemon
//!
//! Applies database migrations on startup, then runs the session janitor
//! until a shutdown signal arrives. The identity services themselves are
//! library crates consumed by whatever surface fronts this deployment.

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use identhub_core::config::AppConfig;
use identhub_core::error::AppError;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Daemon error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration for the current deployment environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("IDENTHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main daemon run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting IdentHub daemon v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = identhub_database::DatabasePool::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    identhub_database::migration::run_migrations(&db).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Session janitor wiring ───────────────────────────
    let session_repo = Arc::new(
        identhub_database::repositories::session::SessionRepository::new(db.pool().clone()),
    );
    let cleanup = Arc::new(identhub_auth::session::cleanup::SessionCleanup::new(
        session_repo,
        &config.session,
    ));
    let janitor = identhub_worker::janitor::SessionJanitor::new(cleanup, &config.session);

    // ── Step 3: Start background janitor ─────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let janitor_handle = tokio::spawn(async move {
        janitor.run(shutdown_rx).await;
    });
    tracing::info!("Session janitor started");

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), janitor_handle).await;
    db.close().await;

    tracing::info!("IdentHub daemon shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
