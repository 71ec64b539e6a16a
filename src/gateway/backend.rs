//! Inference backend
//!
//! The remote classifier is an opaque capability: a batch of feature rows
//! goes in, one fraud probability per row comes out.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("cannot run inference on an empty batch")]
    EmptyBatch,

    #[error("Inference request failed: {0}")]
    Transport(String),

    #[error("Inference request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid inference response: {0}")]
    InvalidResponse(String),

    #[error("Inference returned {actual} probabilities for {expected} instances")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Inference returned an invalid probability {value} at position {index}")]
    InvalidProbability { index: usize, value: f64 },
}

// ============================================================================
// BACKEND TRAIT
// ============================================================================

/// Remote classifier capability
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Score a batch. Implementations make exactly one attempt.
    async fn predict(&self, instances: &[Vec<f32>]) -> Result<Vec<f64>, InferenceError>;

    /// Human-readable backend description for logs
    fn describe(&self) -> String;
}

// ============================================================================
// TF-SERVING HTTP IMPLEMENTATION
// ============================================================================

#[derive(Debug, Serialize)]
struct PredictBody<'a> {
    instances: &'a [Vec<f32>],
}

/// TF-Serving REST `:predict` client
pub struct HttpInferenceBackend {
    url: String,
    http_client: reqwest::Client,
}

impl HttpInferenceBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            http_client,
        })
    }
}

#[async_trait]
impl InferenceBackend for HttpInferenceBackend {
    async fn predict(&self, instances: &[Vec<f32>]) -> Result<Vec<f64>, InferenceError> {
        let response = self.http_client
            .post(&self.url)
            .json(&PredictBody { instances })
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        parse_predictions(&document)
    }

    fn describe(&self) -> String {
        format!("tf-serving {}", self.url)
    }
}

/// Extract `predictions` from a TF-Serving response, flattening `[[p], ..]`
/// into `[p, ..]`.
pub fn parse_predictions(document: &Value) -> Result<Vec<f64>, InferenceError> {
    let predictions = document
        .get("predictions")
        .ok_or_else(|| InferenceError::InvalidResponse("missing 'predictions' field".to_string()))?;

    let mut out = Vec::new();
    flatten_into(predictions, &mut out)?;
    Ok(out)
}

fn flatten_into(value: &Value, out: &mut Vec<f64>) -> Result<(), InferenceError> {
    match value {
        Value::Number(n) => {
            let p = n.as_f64().ok_or_else(|| {
                InferenceError::InvalidResponse(format!("non-numeric prediction {}", n))
            })?;
            out.push(p);
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| flatten_into(item, out)),
        other => Err(InferenceError::InvalidResponse(format!(
            "unexpected prediction value {}",
            other
        ))),
    }
}

// ============================================================================
// TEST DOUBLE
// ============================================================================
