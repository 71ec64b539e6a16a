//! Fraud Monitor Server
//!
//! Serves `/predict` in front of the remote fraud classifier and keeps the
//! quality monitoring tables up to date.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fraud_monitor::{
    config::Config,
    create_router, db,
    gateway::{HttpInferenceBackend, InferenceBackend},
    models::BatchMetrics,
    monitor::{JsonlScalarSink, ScalarSink, StepCounter, TracingScalarSink},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    // Initialize logging
    init_tracing(&config);

    tracing::info!("Fraud Monitor starting...");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Database: {}", config.database_url);
    tracing::info!("Inference endpoint: {}", config.inference_url);

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .context("Failed to run migrations")?;

    // Resume telemetry steps after the last persisted snapshot
    let persisted = BatchMetrics::count(&pool).await?;
    let steps = StepCounter::starting_at(persisted.max(0) as u64);

    let backend: Arc<dyn InferenceBackend> = Arc::new(
        HttpInferenceBackend::new(
            config.inference_url.clone(),
            Duration::from_secs(config.inference_timeout_secs),
        )
        .context("Failed to create inference client")?,
    );

    let sink: Arc<dyn ScalarSink> = match &config.telemetry_log {
        Some(path) => Arc::new(
            JsonlScalarSink::open(path)
                .with_context(|| format!("Failed to open telemetry log {:?}", path))?,
        ),
        None => Arc::new(TracingScalarSink),
    };

    let port = config.port;
    let state = AppState::new(config, pool, backend, sink, steps);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Fraud Monitor stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fraud_monitor=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
