//! Database module - SQLite connection and migrations

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
}

/// Single-connection in-memory pool. Every connection to `sqlite::memory:`
/// opens a fresh database, so the pool is pinned to one connection.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // SQLite executes one statement per prepared query
    for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement)
            .execute(pool)
            .await?;
    }

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Prediction log (one row per scored instance)
CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    latency REAL NOT NULL,
    prediction TEXT NOT NULL,
    probability REAL NOT NULL,
    true_class INTEGER
);

-- Aggregate metrics (one row per request with labeled history)
CREATE TABLE IF NOT EXISTS batch_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    num_samples INTEGER NOT NULL,
    avg_probability REAL NOT NULL,
    accuracy REAL NOT NULL,
    precision REAL,
    recall REAL,
    f1_score REAL
);

-- Threshold breaches
CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    metric TEXT NOT NULL,
    value REAL NOT NULL,
    threshold REAL NOT NULL,
    timestamp TEXT NOT NULL
);

-- Remediation hints, 1:1 with alerts
CREATE TABLE IF NOT EXISTS actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    metric TEXT NOT NULL,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_logs_labeled ON logs(true_class) WHERE true_class IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_alerts_metric ON alerts(metric, timestamp)
"#;
