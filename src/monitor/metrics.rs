//! Classifier quality metrics over labeled history.

use serde::{Deserialize, Serialize};

use crate::gateway::Label;

/// One labeled prediction read back from the log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledOutcome {
    pub predicted: Label,
    pub actual: u8,
    pub latency: f64,
}

/// Binary confusion counts, fraud = positive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

impl ConfusionCounts {
    pub fn record(&mut self, predicted: Label, actual: u8) {
        match (predicted.is_positive(), actual == 1) {
            (true, true) => self.true_positive += 1,
            (true, false) => self.false_positive += 1,
            (false, false) => self.true_negative += 1,
            (false, true) => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| (self.true_positive + self.true_negative) as f64 / total as f64)
    }

    /// `None` when nothing was predicted positive
    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// `None` when there are no actual positives
    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

/// Harmonic mean; undefined if either input is undefined
pub fn f1_score(precision: Option<f64>, recall: Option<f64>) -> Option<f64> {
    let (p, r) = (precision?, recall?);
    if p + r == 0.0 {
        Some(0.0)
    } else {
        Some(2.0 * p * r / (p + r))
    }
}

/// Aggregate over all labeled history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub labeled_count: usize,
    pub counts: ConfusionCounts,
    pub accuracy: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub avg_latency: f64,
}

impl QualityMetrics {
    /// `None` for an empty history
    pub fn compute(history: &[LabeledOutcome]) -> Option<Self> {
        let mut counts = ConfusionCounts::default();
        let mut latency_sum = 0.0;

        for outcome in history {
            counts.record(outcome.predicted, outcome.actual);
            latency_sum += outcome.latency;
        }

        let accuracy = counts.accuracy()?;
        let precision = counts.precision();
        let recall = counts.recall();

        Some(Self {
            labeled_count: history.len(),
            counts,
            accuracy,
            precision,
            recall,
            f1: f1_score(precision, recall),
            avg_latency: latency_sum / history.len() as f64,
        })
    }
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
