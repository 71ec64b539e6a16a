use std::collections::BTreeSet;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use sqlx::SqlitePool;

use super::*;
use crate::db;
use crate::models::{ActionRecord, AlertRecord, BatchMetrics, PredictionLog};
use crate::AppError;

/// Rejects every publish
struct FailingSink;

impl ScalarSink for FailingSink {
    fn publish(&self, _scalars: &[Scalar]) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::other("disk full")))
    }
}

async fn setup() -> (Arc<QualityMonitor>, Arc<MemoryScalarSink>, SqlitePool) {
    let pool = db::create_memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let sink = Arc::new(MemoryScalarSink::new());
    let monitor = QualityMonitor::new(pool.clone(), Thresholds::default(), StepCounter::new(), sink.clone());
    (Arc::new(monitor), sink, pool)
}

fn scored(probability: f64, true_class: Option<u8>) -> NewPrediction {
    NewPrediction {
        label: Label::from_probability(probability),
        probability,
        true_class,
    }
}

#[tokio::test]
async fn test_unlabeled_batch_is_logged_without_evaluation() {
    let (monitor, sink, pool) = setup().await;

    let eval = monitor
        .record_and_evaluate(&[scored(0.9, None), scored(0.1, None)], 0.05)
        .await
        .unwrap();

    assert_eq!(eval.logged, 2);
    assert!(eval.snapshot.is_none());
    assert!(eval.alerts.is_empty());
    assert!(eval.actions.is_empty());
    assert_eq!(eval.step, None);

    assert_eq!(PredictionLog::counts(&pool).await.unwrap(), (2, 0));
    assert_eq!(BatchMetrics::count(&pool).await.unwrap(), 0);
    assert_eq!(AlertRecord::count(&pool).await.unwrap(), 0);
    assert!(sink.scalars().is_empty());
    assert_eq!(monitor.current_step(), 0);
}

#[tokio::test]
async fn test_false_positive_raises_accuracy_alert_once() {
    let (monitor, sink, pool) = setup().await;

    // Predicted Fraud (0.7), truly Not Fraud
    let eval = monitor.record_and_evaluate(&[scored(0.7, Some(0))], 0.01).await.unwrap();

    let snapshot = eval.snapshot.unwrap();
    assert_eq!(snapshot.sample_count, 1);
    assert_eq!(snapshot.mean_probability, 0.7);
    assert_eq!(snapshot.accuracy, 0.0);
    assert_eq!(snapshot.precision, Some(0.0));
    assert_eq!(snapshot.recall, None);
    assert_eq!(snapshot.f1, None);

    let accuracy_alerts: Vec<_> = eval.alerts.iter().filter(|a| a.metric == Metric::Accuracy).collect();
    assert_eq!(accuracy_alerts.len(), 1);
    assert_eq!(accuracy_alerts[0].value, 0.0);
    assert_eq!(accuracy_alerts[0].threshold, 0.90);

    // Recall is undefined, so it is never compared
    let metrics: Vec<Metric> = eval.alerts.iter().map(|a| a.metric).collect();
    assert_eq!(metrics, vec![Metric::Accuracy, Metric::Precision]);

    let actions: Vec<&str> = eval.actions.iter().map(|a| a.action).collect();
    assert_eq!(actions, vec![
        "Flag model as degraded due to low accuracy.",
        "Investigate false positives (precision issue).",
    ]);

    let stored = AlertRecord::list(&pool, 10, 0).await.unwrap();
    assert_eq!(stored.iter().filter(|a| a.metric == "accuracy").count(), 1);

    // Undefined metrics are stored as NULL and not published
    let latest = BatchMetrics::latest(&pool).await.unwrap().unwrap();
    assert_eq!(latest.recall, None);
    assert_eq!(latest.f1_score, None);

    let names: Vec<String> = sink.scalars().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["accuracy", "precision", "avg_latency"]);
    assert_eq!(eval.step, Some(0));
}

#[tokio::test]
async fn test_healthy_history_raises_nothing() {
    let (monitor, sink, pool) = setup().await;

    let batch = [
        scored(0.9, Some(1)),
        scored(0.8, Some(1)),
        scored(0.1, Some(0)),
        scored(0.2, Some(0)),
    ];
    let eval = monitor.record_and_evaluate(&batch, 0.1).await.unwrap();

    assert!(eval.alerts.is_empty());
    assert!(eval.actions.is_empty());
    let snapshot = eval.snapshot.unwrap();
    assert_eq!(snapshot.accuracy, 1.0);
    assert_eq!(snapshot.precision, Some(1.0));
    assert_eq!(snapshot.recall, Some(1.0));
    assert_eq!(snapshot.f1, Some(1.0));

    assert_eq!(BatchMetrics::count(&pool).await.unwrap(), 1);
    assert_eq!(AlertRecord::count(&pool).await.unwrap(), 0);
    assert_eq!(sink.scalars().len(), 5);
}

#[tokio::test]
async fn test_metrics_cover_full_history() {
    let (monitor, _, _) = setup().await;

    monitor.record_and_evaluate(&[scored(0.9, Some(1))], 0.1).await.unwrap();
    monitor.record_and_evaluate(&[scored(0.9, Some(0))], 0.3).await.unwrap();

    // Unlabeled batch still re-evaluates over the existing labeled log
    let eval = monitor
        .record_and_evaluate(&[scored(0.2, None), scored(0.4, None)], 0.2)
        .await
        .unwrap();

    let snapshot = eval.snapshot.unwrap();
    assert_eq!(snapshot.sample_count, 2);
    assert!((snapshot.mean_probability - 0.3).abs() < 1e-12);
    assert_eq!(snapshot.accuracy, 0.5);

    let quality = eval.metrics.unwrap();
    assert_eq!(quality.labeled_count, 2);
    assert!((quality.avg_latency - 0.2).abs() < 1e-12);
    assert_eq!(eval.step, Some(2));
}

#[tokio::test]
async fn test_slow_request_raises_latency_alert() {
    let (monitor, _, _) = setup().await;

    let eval = monitor
        .record_and_evaluate(&[scored(0.9, Some(1)), scored(0.1, Some(0))], 0.75)
        .await
        .unwrap();

    assert_eq!(eval.alerts.len(), 1);
    assert_eq!(eval.alerts[0].metric, Metric::Latency);
    assert_eq!(eval.alerts[0].value, 0.75);
    assert_eq!(eval.actions[0].action, "Check system performance / optimize latency.");
}

#[tokio::test]
async fn test_malformed_history_fails_without_partial_alerts() {
    let (monitor, sink, pool) = setup().await;

    sqlx::query("INSERT INTO logs (timestamp, latency, prediction, probability, true_class) VALUES (?, 0.1, 'Maybe', 0.5, 1)")
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    let err = monitor
        .record_and_evaluate(&[scored(0.7, Some(0))], 0.1)
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::MalformedHistory(_)));

    // The batch stays logged; nothing downstream was committed
    assert_eq!(PredictionLog::counts(&pool).await.unwrap(), (2, 2));
    assert_eq!(BatchMetrics::count(&pool).await.unwrap(), 0);
    assert_eq!(AlertRecord::count(&pool).await.unwrap(), 0);
    assert!(sink.scalars().is_empty());
    assert_eq!(monitor.current_step(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_get_distinct_steps() {
    let (monitor, sink, pool) = setup().await;

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let monitor = monitor.clone();
            tokio::spawn(async move {
                let batch = [scored(if i % 2 == 0 { 0.9 } else { 0.1 }, Some(1))];
                monitor.record_and_evaluate(&batch, 0.01).await.unwrap().step.unwrap()
            })
        })
        .collect();

    let mut steps = BTreeSet::new();
    for task in tasks {
        assert!(steps.insert(task.await.unwrap()));
    }

    assert_eq!(steps, (0..16).collect::<BTreeSet<u64>>());
    assert_eq!(monitor.current_step(), 16);
    assert_eq!(BatchMetrics::count(&pool).await.unwrap(), 16);
    assert_eq!(sink.steps().len(), 16);
}

#[tokio::test]
async fn test_sink_failure_keeps_committed_evaluation() {
    let pool = db::create_memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let monitor = QualityMonitor::new(pool.clone(), Thresholds::default(), StepCounter::new(), Arc::new(FailingSink));

    let err = monitor
        .record_and_evaluate(&[scored(0.7, Some(0))], 0.01)
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::Telemetry(_)));
    assert!(err.to_string().contains("disk full"));

    // Snapshot, alerts and actions were committed before publishing
    assert_eq!(PredictionLog::counts(&pool).await.unwrap(), (1, 1));
    assert_eq!(BatchMetrics::count(&pool).await.unwrap(), 1);
    assert_eq!(AlertRecord::count(&pool).await.unwrap(), 2);
    assert_eq!(ActionRecord::list(&pool, 10, 0).await.unwrap().len(), 2);

    // The step was consumed
    assert_eq!(monitor.current_step(), 1);

    let response = AppError::from(err).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
