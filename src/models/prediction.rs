//! Prediction log model

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Row, SqlitePool};

use crate::gateway::Label;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PredictionLog {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub latency: f64,
    pub prediction: String,
    pub probability: f64,
    pub true_class: Option<i64>,
}

/// A scored instance about to be logged
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPrediction {
    pub label: Label,
    pub probability: f64,
    pub true_class: Option<u8>,
}

/// Labeled history row, exactly as stored
#[derive(Debug, Clone, FromRow)]
pub struct LabeledRow {
    pub prediction: String,
    pub true_class: i64,
    pub latency: f64,
}

impl PredictionLog {
    /// Append one row per prediction, committed before returning
    pub async fn insert_batch(
        pool: &SqlitePool,
        predictions: &[NewPrediction],
        latency: f64,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;

        for p in predictions {
            let result = sqlx::query(
                r#"
                INSERT INTO logs (timestamp, latency, prediction, probability, true_class)
                VALUES (?, ?, ?, ?, ?)
                "#
            )
            .bind(Utc::now())
            .bind(latency)
            .bind(p.label.as_str())
            .bind(p.probability)
            .bind(p.true_class.map(i64::from))
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Every row that carries ground truth
    pub async fn labeled_history(pool: &SqlitePool) -> Result<Vec<LabeledRow>, sqlx::Error> {
        sqlx::query_as::<_, LabeledRow>(
            r#"
            SELECT prediction, true_class, latency
            FROM logs
            WHERE true_class IS NOT NULL
            ORDER BY id ASC
            "#
        )
        .fetch_all(pool)
        .await
    }

    pub async fn list_recent(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PredictionLog>(
            "SELECT * FROM logs ORDER BY id DESC LIMIT ? OFFSET ?"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// (total rows, labeled rows)
    pub async fn counts(pool: &SqlitePool) -> Result<(i64, i64), sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(true_class) as labeled
            FROM logs
            "#
        )
        .fetch_one(pool)
        .await?;

        Ok((row.get("total"), row.get("labeled")))
    }
}
