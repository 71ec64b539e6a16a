//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::monitor::Thresholds;

/// Default feature width of one transaction vector
pub const DEFAULT_FEATURE_COUNT: usize = 33;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server port
    pub port: u16,

    /// Remote inference endpoint (TF-Serving style `:predict` URL)
    pub inference_url: String,

    /// Timeout for one inference call, in seconds
    pub inference_timeout_secs: u64,

    /// Expected width of every instance
    pub feature_count: usize,

    /// JSONL file for published scalars. `None` logs them through tracing.
    pub telemetry_log: Option<PathBuf>,

    /// Quality thresholds
    pub thresholds: Thresholds,

    /// Environment (development, production)
    pub environment: String,

    /// `LOG_FORMAT=json` was requested
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://monitoring.db?mode=rwc".to_string(),
            port: 5000,
            inference_url: "http://localhost:8501/v1/models/fraud_model:predict".to_string(),
            inference_timeout_secs: 10,
            feature_count: DEFAULT_FEATURE_COUNT,
            telemetry_log: None,
            thresholds: Thresholds::default(),
            environment: "development".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or(defaults.database_url),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            inference_url: env::var("INFERENCE_URL")
                .unwrap_or(defaults.inference_url),

            inference_timeout_secs: env::var("INFERENCE_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.inference_timeout_secs),

            feature_count: env::var("FEATURE_COUNT")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.feature_count),

            telemetry_log: env::var("TELEMETRY_LOG")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            thresholds: defaults.thresholds,

            environment: env::var("ENVIRONMENT")
                .unwrap_or(defaults.environment),

            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.log_json),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Production always logs JSON
    pub fn json_logs(&self) -> bool {
        self.log_json || self.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.feature_count, 33);
        assert_eq!(config.inference_timeout_secs, 10);
        assert!(config.telemetry_log.is_none());
        assert!(!config.is_production());
        assert!(!config.json_logs());
    }

    #[test]
    fn test_production_logs_json() {
        let config = Config {
            environment: "production".to_string(),
            ..Config::default()
        };
        assert!(config.is_production());
        assert!(config.json_logs());

        let config = Config {
            log_json: true,
            ..Config::default()
        };
        assert!(!config.is_production());
        assert!(config.json_logs());
    }
}
