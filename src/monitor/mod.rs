//! Quality Monitor
//!
//! Runs once per `/predict` request, inline:
//!
//! ```text
//!   append predictions ──► read labeled history ──► aggregate
//!                                                      │
//!        publish scalars ◄── record alerts/actions ◄── compare thresholds
//! ```
//!
//! Metrics are always recomputed over the full labeled log, never just the
//! current batch. Prediction rows are committed before aggregation; the
//! snapshot, alerts and actions of one request commit together.

pub mod metrics;
pub mod sink;
pub mod step;
pub mod thresholds;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::gateway::label::UnknownLabel;
use crate::gateway::Label;
use crate::models::{ActionRecord, AlertRecord, BatchMetrics, LabeledRow, NewBatchMetrics, NewPrediction, PredictionLog};

pub use metrics::{ConfusionCounts, LabeledOutcome, QualityMetrics};
pub use sink::{JsonlScalarSink, MemoryScalarSink, Scalar, ScalarSink, SinkError, TracingScalarSink};
pub use step::StepCounter;
pub use thresholds::{Breach, Metric, Thresholds};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed history row: {0}")]
    MalformedHistory(String),

    #[error("failed to publish telemetry: {0}")]
    Telemetry(#[from] SinkError),
}

impl From<UnknownLabel> for MonitorError {
    fn from(err: UnknownLabel) -> Self {
        MonitorError::MalformedHistory(err.to_string())
    }
}

/// Aggregate emitted for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Size of the current batch
    pub sample_count: usize,
    /// Mean probability of the current batch
    pub mean_probability: f64,
    pub accuracy: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub metric: Metric,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub metric: Metric,
    pub action: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Everything one request produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub logged: u64,
    pub snapshot: Option<MetricsSnapshot>,
    pub metrics: Option<QualityMetrics>,
    pub alerts: Vec<Alert>,
    pub actions: Vec<Action>,
    /// Telemetry step the scalars were published under
    pub step: Option<u64>,
}

pub struct QualityMonitor {
    pool: SqlitePool,
    thresholds: Thresholds,
    steps: StepCounter,
    sink: Arc<dyn ScalarSink>,
}

impl QualityMonitor {
    pub fn new(pool: SqlitePool, thresholds: Thresholds, steps: StepCounter, sink: Arc<dyn ScalarSink>) -> Self {
        Self {
            pool,
            thresholds,
            steps,
            sink,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Next telemetry step to be handed out
    pub fn current_step(&self) -> u64 {
        self.steps.peek()
    }

    /// Log a scored batch, then re-evaluate quality over all labeled history.
    pub async fn record_and_evaluate(
        &self,
        predictions: &[NewPrediction],
        latency: f64,
    ) -> Result<Evaluation, MonitorError> {
        let logged = PredictionLog::insert_batch(&self.pool, predictions, latency).await?;

        let history = PredictionLog::labeled_history(&self.pool).await?;
        let outcomes = to_outcomes(&history)?;

        let Some(quality) = QualityMetrics::compute(&outcomes) else {
            tracing::debug!("No labeled history yet, skipping evaluation");
            return Ok(Evaluation { logged, ..Default::default() });
        };

        let now = Utc::now();
        let probabilities: Vec<f64> = predictions.iter().map(|p| p.probability).collect();
        let snapshot = MetricsSnapshot {
            timestamp: now,
            sample_count: predictions.len(),
            mean_probability: metrics::mean(&probabilities).unwrap_or(0.0),
            accuracy: quality.accuracy,
            precision: quality.precision,
            recall: quality.recall,
            f1: quality.f1,
        };

        let breaches = self.thresholds.evaluate(&quality, latency);
        let (alerts, actions) = self.persist(&snapshot, &breaches, now).await?;

        for alert in &alerts {
            tracing::warn!(
                "Quality alert: {} = {:.4} (threshold {:.2}) -> {}",
                alert.metric,
                alert.value,
                alert.threshold,
                alert.metric.remediation()
            );
        }

        let step = self.steps.next();
        self.sink.publish(&scalars(&quality, step))?;

        tracing::info!(
            "Evaluated {} labeled predictions at step {}: accuracy={:.4}, {} alert(s)",
            quality.labeled_count,
            step,
            quality.accuracy,
            alerts.len()
        );

        Ok(Evaluation {
            logged,
            snapshot: Some(snapshot),
            metrics: Some(quality),
            alerts,
            actions,
            step: Some(step),
        })
    }

    /// Snapshot, alerts and actions in one transaction
    async fn persist(
        &self,
        snapshot: &MetricsSnapshot,
        breaches: &[Breach],
        now: DateTime<Utc>,
    ) -> Result<(Vec<Alert>, Vec<Action>), MonitorError> {
        let mut tx = self.pool.begin().await?;

        BatchMetrics::insert(&mut *tx, &NewBatchMetrics {
            timestamp: snapshot.timestamp,
            num_samples: snapshot.sample_count as i64,
            avg_probability: snapshot.mean_probability,
            accuracy: snapshot.accuracy,
            precision: snapshot.precision,
            recall: snapshot.recall,
            f1_score: snapshot.f1,
        })
        .await?;

        let mut alerts = Vec::with_capacity(breaches.len());
        let mut actions = Vec::with_capacity(breaches.len());

        for breach in breaches {
            let name = breach.metric.name();
            let remediation = breach.metric.remediation();

            AlertRecord::insert(&mut *tx, name, breach.value, breach.threshold, now).await?;
            ActionRecord::insert(&mut *tx, name, remediation, now).await?;

            alerts.push(Alert {
                metric: breach.metric,
                value: breach.value,
                threshold: breach.threshold,
                timestamp: now,
            });
            actions.push(Action {
                metric: breach.metric,
                action: remediation,
                timestamp: now,
            });
        }

        tx.commit().await?;
        Ok((alerts, actions))
    }
}

fn to_outcomes(history: &[LabeledRow]) -> Result<Vec<LabeledOutcome>, MonitorError> {
    history
        .iter()
        .map(|row| {
            let predicted: Label = row.prediction.parse()?;
            let actual = match row.true_class {
                0 => 0,
                1 => 1,
                other => {
                    return Err(MonitorError::MalformedHistory(format!(
                        "true_class {} is not a binary label",
                        other
                    )))
                }
            };
            Ok(LabeledOutcome {
                predicted,
                actual,
                latency: row.latency,
            })
        })
        .collect()
}

/// Scalars for one step. Undefined metrics are left out.
fn scalars(quality: &QualityMetrics, step: u64) -> Vec<Scalar> {
    [
        ("accuracy", Some(quality.accuracy)),
        ("precision", quality.precision),
        ("recall", quality.recall),
        ("f1_score", quality.f1),
        ("avg_latency", Some(quality.avg_latency)),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| Scalar::new(name, v, step)))
    .collect()
}

#[cfg(test)]
mod tests;
