//! Fraud Monitor
//!
//! Inference gateway and quality monitor for a remotely hosted
//! fraud-detection classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FRAUD MONITOR                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  POST /predict                                              │
//! │     │                                                       │
//! │     ▼                                                       │
//! │  ┌───────────┐   one call    ┌───────────────────────────┐ │
//! │  │ Inference │──────────────►│ Remote classifier (HTTP)  │ │
//! │  │ Gateway   │◄──────────────│                           │ │
//! │  └─────┬─────┘ probabilities └───────────────────────────┘ │
//! │        ▼                                                    │
//! │  ┌───────────┐  logs / batch_metrics / alerts / actions     │
//! │  │ Quality   │──────────────►┌─────────────┐               │
//! │  │ Monitor   │               │   SQLite    │               │
//! │  └─────┬─────┘               └─────────────┘               │
//! │        └──────► scalar sink (accuracy, precision, ...)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod monitor;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

use gateway::{Gateway, InferenceBackend};
use monitor::{QualityMonitor, ScalarSink, StepCounter};

/// Largest accepted request body (CSV batches can be big)
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub config: config::Config,
    pub gateway: Arc<Gateway>,
    pub monitor: Arc<QualityMonitor>,
}

impl AppState {
    /// Wire the gateway and monitor around their collaborators
    pub fn new(
        config: config::Config,
        pool: sqlx::SqlitePool,
        backend: Arc<dyn InferenceBackend>,
        sink: Arc<dyn ScalarSink>,
        steps: StepCounter,
    ) -> Self {
        let gateway = Gateway::new(backend, config.feature_count);
        let monitor = QualityMonitor::new(pool.clone(), config.thresholds, steps, sink);

        Self {
            pool,
            config,
            gateway: Arc::new(gateway),
            monitor: Arc::new(monitor),
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let monitoring_routes = Router::new()
        .route("/api/v1/metrics", get(handlers::monitoring::list_metrics))
        .route("/api/v1/metrics/latest", get(handlers::monitoring::latest_metrics))
        .route("/api/v1/alerts", get(handlers::monitoring::list_alerts))
        .route("/api/v1/actions", get(handlers::monitoring::list_actions))
        .route("/api/v1/predictions", get(handlers::monitoring::list_predictions))
        .route("/api/v1/summary", get(handlers::monitoring::summary));

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .merge(monitoring_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
