//! Prediction handler

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::gateway::{PayloadError, PredictRequest, PredictResponse};
use crate::models::NewPrediction;
use crate::{AppResult, AppState};

/// Score a batch and re-evaluate model quality
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<PredictResponse>> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id);

    handle(state, headers, body).instrument(span).await
}

async fn handle(state: AppState, headers: HeaderMap, body: Bytes) -> AppResult<Json<PredictResponse>> {
    if !is_json(&headers) {
        return Err(PayloadError::NotJson.into());
    }

    let request = PredictRequest::from_body(&body, state.gateway.feature_count())
        .inspect_err(|e| tracing::debug!("Rejected request: {}", e))?;

    let outcome = state.gateway.infer(&request.instances).await?;

    let predictions: Vec<NewPrediction> = outcome
        .labels
        .iter()
        .zip(&outcome.probabilities)
        .zip(&request.true_class)
        .map(|((&label, &probability), &true_class)| NewPrediction {
            label,
            probability,
            true_class,
        })
        .collect();

    let evaluation = state
        .monitor
        .record_and_evaluate(&predictions, outcome.latency)
        .await?;

    tracing::info!(
        "Scored {} instances in {:.3}s (snapshot: {}, alerts: {})",
        predictions.len(),
        outcome.latency,
        evaluation.snapshot.is_some(),
        evaluation.alerts.len()
    );

    Ok(Json(PredictResponse::from(outcome)))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}
