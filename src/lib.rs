use anyhow::{Context, Result};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod device_tokens;
pub mod error;
pub mod messages;
pub mod messaging_service;
pub mod metrics;
pub mod models;
pub mod push;
pub mod recipient;
pub mod routes;
pub mod storage;
pub mod threads;
pub mod utils;

pub use error::{AppError, AppResult};

use config::{Config, StorageBackend};
use context::AppContext;
use storage::{MemoryStorage, PostgresStorage, Repositories};

/// Build the repositories for the configured backend.
///
/// For Postgres this connects the pool and applies pending migrations.
pub async fn build_repositories(config: &Config) -> Result<Repositories> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config.database_url, &config.db).await?;
            tracing::info!("Connected to database");

            tracing::info!("Applying database migrations...");
            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied successfully.");

            Ok(Repositories::postgres(Arc::new(PostgresStorage::new(pool))))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Repositories::memory(Arc::new(MemoryStorage::new())))
        }
    }
}

/// Serve the HTTP API on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app_context: Arc<AppContext>, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = routes::create_router(app_context);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received. Shutting down...");
}

pub async fn run() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_config = Arc::new(config);

    let repos = build_repositories(&app_config).await?;
    let app_context = Arc::new(AppContext::from_config(app_config.clone(), repos)?);

    let listener = TcpListener::bind(&app_config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", app_config.bind_address))?;
    tracing::info!(
        bind_address = %app_config.bind_address,
        storage = ?app_config.storage_backend,
        push = ?app_config.push.provider,
        "Threadline server listening"
    );

    serve(listener, app_context, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}
