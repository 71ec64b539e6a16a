//! Static quality thresholds and breach detection.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::metrics::QualityMetrics;

/// Monitored metric, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Accuracy,
    Precision,
    Recall,
    Latency,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Accuracy, Metric::Precision, Metric::Recall, Metric::Latency];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
            Metric::Latency => "latency",
        }
    }

    /// Canonical remediation hint recorded with every breach
    pub fn remediation(&self) -> &'static str {
        match self {
            Metric::Accuracy => "Flag model as degraded due to low accuracy.",
            Metric::Precision => "Investigate false positives (precision issue).",
            Metric::Recall => "Investigate false negatives (recall issue).",
            Metric::Latency => "Check system performance / optimize latency.",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Threshold configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum accuracy
    pub accuracy: f64,

    /// Minimum precision
    pub precision: f64,

    /// Minimum recall
    pub recall: f64,

    /// Maximum inference latency (seconds)
    pub latency: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            accuracy: 0.90,
            precision: 0.75,
            recall: 0.35,
            latency: 0.50,
        }
    }
}

/// A metric on the wrong side of its threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breach {
    pub metric: Metric,
    pub value: f64,
    pub threshold: f64,
}

impl Thresholds {
    pub fn limit(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy => self.accuracy,
            Metric::Precision => self.precision,
            Metric::Recall => self.recall,
            Metric::Latency => self.latency,
        }
    }

    /// Compare aggregate metrics and the request latency. Undefined metrics
    /// are skipped.
    pub fn evaluate(&self, metrics: &QualityMetrics, latency: f64) -> Vec<Breach> {
        Metric::ALL
            .iter()
            .filter_map(|&metric| {
                let (value, breached) = match metric {
                    Metric::Accuracy => (metrics.accuracy, metrics.accuracy < self.accuracy),
                    Metric::Precision => {
                        let p = metrics.precision?;
                        (p, p < self.precision)
                    }
                    Metric::Recall => {
                        let r = metrics.recall?;
                        (r, r < self.recall)
                    }
                    Metric::Latency => (latency, latency > self.latency),
                };

                breached.then_some(Breach {
                    metric,
                    value,
                    threshold: self.limit(metric),
                })
            })
            .collect()
    }
}
