//! Inference Gateway
//!
//! Sends a validated batch to the inference backend, times the call and
//! turns probabilities into fraud labels.

pub mod backend;
pub mod label;
pub mod payload;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use backend::{HttpInferenceBackend, InferenceBackend, InferenceError};
pub use label::{label_all, Label, DECISION_BOUNDARY};
pub use payload::{PayloadError, PredictRequest, TrueClass};

/// Result of one inference call
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutcome {
    pub labels: Vec<Label>,
    pub probabilities: Vec<f64>,
    /// Wall-clock seconds of the backend call alone
    pub latency: f64,
}

/// `/predict` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Label>,
    pub probabilities: Vec<f64>,
    pub latency: f64,
}

impl From<InferenceOutcome> for PredictResponse {
    fn from(outcome: InferenceOutcome) -> Self {
        Self {
            predictions: outcome.labels,
            probabilities: outcome.probabilities,
            latency: outcome.latency,
        }
    }
}

pub struct Gateway {
    backend: Arc<dyn InferenceBackend>,
    feature_count: usize,
}

impl Gateway {
    pub fn new(backend: Arc<dyn InferenceBackend>, feature_count: usize) -> Self {
        Self { backend, feature_count }
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn backend_name(&self) -> String {
        self.backend.describe()
    }

    /// Score a batch with a single backend call
    pub async fn infer(&self, instances: &[Vec<f32>]) -> Result<InferenceOutcome, InferenceError> {
        if instances.is_empty() {
            return Err(InferenceError::EmptyBatch);
        }

        let start = Instant::now();
        let probabilities = self.backend.predict(instances).await?;
        let latency = start.elapsed().as_secs_f64();

        if probabilities.len() != instances.len() {
            return Err(InferenceError::CountMismatch {
                expected: instances.len(),
                actual: probabilities.len(),
            });
        }

        if let Some((index, &value)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(InferenceError::InvalidProbability { index, value });
        }

        tracing::debug!(
            "Scored {} instances in {:.3}s via {}",
            instances.len(),
            latency,
            self.backend.describe()
        );

        Ok(InferenceOutcome {
            labels: label_all(&probabilities),
            probabilities,
            latency,
        })
    }
}
