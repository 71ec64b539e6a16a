//! Batch metrics snapshot model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

/// Stored aggregate. `None` columns are undefined metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BatchMetrics {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub num_samples: i64,
    pub avg_probability: f64,
    pub accuracy: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBatchMetrics {
    pub timestamp: DateTime<Utc>,
    pub num_samples: i64,
    pub avg_probability: f64,
    pub accuracy: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
}

impl BatchMetrics {
    pub async fn insert(conn: &mut SqliteConnection, data: &NewBatchMetrics) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BatchMetrics>(
            r#"
            INSERT INTO batch_metrics (timestamp, num_samples, avg_probability, accuracy, precision, recall, f1_score)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#
        )
        .bind(data.timestamp)
        .bind(data.num_samples)
        .bind(data.avg_probability)
        .bind(data.accuracy)
        .bind(data.precision)
        .bind(data.recall)
        .bind(data.f1_score)
        .fetch_one(conn)
        .await
    }

    pub async fn latest(pool: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BatchMetrics>("SELECT * FROM batch_metrics ORDER BY id DESC LIMIT 1")
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BatchMetrics>(
            "SELECT * FROM batch_metrics ORDER BY id DESC LIMIT ? OFFSET ?"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM batch_metrics")
            .fetch_one(pool)
            .await
    }
}
