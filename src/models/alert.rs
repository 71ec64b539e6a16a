//! Alert and action models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AlertRecord {
    pub id: i64,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActionRecord {
    pub id: i64,
    pub metric: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl AlertRecord {
    pub async fn insert(
        conn: &mut SqliteConnection,
        metric: &str,
        value: f64,
        threshold: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AlertRecord>(
            r#"
            INSERT INTO alerts (metric, value, threshold, timestamp)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#
        )
        .bind(metric)
        .bind(value)
        .bind(threshold)
        .bind(timestamp)
        .fetch_one(conn)
        .await
    }

    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AlertRecord>(
            "SELECT * FROM alerts ORDER BY id DESC LIMIT ? OFFSET ?"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM alerts")
            .fetch_one(pool)
            .await
    }
}

impl ActionRecord {
    pub async fn insert(
        conn: &mut SqliteConnection,
        metric: &str,
        action: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ActionRecord>(
            r#"
            INSERT INTO actions (metric, action, timestamp)
            VALUES (?, ?, ?)
            RETURNING *
            "#
        )
        .bind(metric)
        .bind(action)
        .bind(timestamp)
        .fetch_one(conn)
        .await
    }

    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActionRecord>(
            "SELECT * FROM actions ORDER BY id DESC LIMIT ? OFFSET ?"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
