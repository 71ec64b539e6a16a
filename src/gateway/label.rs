//! Decision rule: probability → binary fraud label.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed decision boundary. Strictly greater is Fraud.
pub const DECISION_BOUNDARY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Fraud")]
    Fraud,
    #[serde(rename = "Not Fraud")]
    NotFraud,
}

impl Label {
    pub fn from_probability(probability: f64) -> Self {
        if probability > DECISION_BOUNDARY {
            Label::Fraud
        } else {
            Label::NotFraud
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fraud => "Fraud",
            Label::NotFraud => "Not Fraud",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Label::Fraud)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown prediction label: {0:?}")]
pub struct UnknownLabel(pub String);

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fraud" => Ok(Label::Fraud),
            "Not Fraud" => Ok(Label::NotFraud),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// Label every probability of a batch
pub fn label_all(probabilities: &[f64]) -> Vec<Label> {
    probabilities.iter().copied().map(Label::from_probability).collect()
}
