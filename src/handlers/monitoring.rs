//! Read-only monitoring handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::{ActionRecord, AlertRecord, BatchMetrics, Page, PredictionLog};
use crate::monitor::Thresholds;
use crate::{AppResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct MonitoringSummary {
    pub total_predictions: i64,
    pub labeled_predictions: i64,
    pub snapshots: i64,
    pub alerts: i64,
    pub next_step: u64,
    pub thresholds: Thresholds,
    pub latest: Option<BatchMetrics>,
}

/// Most recent metrics snapshot
pub async fn latest_metrics(
    State(state): State<AppState>,
) -> AppResult<Json<Option<BatchMetrics>>> {
    let latest = BatchMetrics::latest(&state.pool).await?;
    Ok(Json(latest))
}

/// Metrics snapshots, newest first
pub async fn list_metrics(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<BatchMetrics>>> {
    let snapshots = BatchMetrics::list(&state.pool, page.limit(), page.offset()).await?;
    Ok(Json(snapshots))
}

/// Alerts, newest first
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<AlertRecord>>> {
    let alerts = AlertRecord::list(&state.pool, page.limit(), page.offset()).await?;
    Ok(Json(alerts))
}

/// Remediation actions, newest first
pub async fn list_actions(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<ActionRecord>>> {
    let actions = ActionRecord::list(&state.pool, page.limit(), page.offset()).await?;
    Ok(Json(actions))
}

/// Logged predictions, newest first
pub async fn list_predictions(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<PredictionLog>>> {
    let logs = PredictionLog::list_recent(&state.pool, page.limit(), page.offset()).await?;
    Ok(Json(logs))
}

/// Totals across the monitoring tables
pub async fn summary(
    State(state): State<AppState>,
) -> AppResult<Json<MonitoringSummary>> {
    let (total_predictions, labeled_predictions) = PredictionLog::counts(&state.pool).await?;
    let snapshots = BatchMetrics::count(&state.pool).await?;
    let alerts = AlertRecord::count(&state.pool).await?;
    let latest = BatchMetrics::latest(&state.pool).await?;

    Ok(Json(MonitoringSummary {
        total_predictions,
        labeled_predictions,
        snapshots,
        alerts,
        next_step: state.monitor.current_step(),
        thresholds: *state.monitor.thresholds(),
        latest,
    }))
}
