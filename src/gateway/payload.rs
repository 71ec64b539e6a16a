//! `/predict` request payload: validation and normalization.
//!
//! The payload is validated against a raw `serde_json::Value` so every
//! malformed shape maps to its own message instead of a generic
//! deserialization error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    #[error("Request must be JSON")]
    NotJson,

    #[error("Invalid JSON payload")]
    InvalidJson,

    #[error("Missing 'instances' field")]
    MissingInstances,

    #[error("'instances' must be a list")]
    InstancesNotList,

    #[error("'instances' cannot be empty")]
    EmptyInstances,

    #[error("instance {index} must be a list of numbers")]
    InvalidInstance { index: usize },

    #[error("instance {index} has a non-numeric value at position {position}")]
    NonNumeric { index: usize, position: usize },

    #[error("instance {index} has {actual} features, expected {expected}")]
    WidthMismatch { index: usize, expected: usize, actual: usize },

    #[error("invalid 'true_class': {0}")]
    InvalidTrueClass(String),

    #[error("'true_class' has {actual} entries but 'instances' has {expected}")]
    TrueClassLength { expected: usize, actual: usize },
}

/// Ground truth as sent by the caller: one class for the whole batch or
/// one (nullable) class per instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrueClass {
    Scalar(i64),
    PerInstance(Vec<Option<i64>>),
}

impl TrueClass {
    /// Resolve into one optional class per instance
    pub fn resolve(&self, batch_len: usize) -> Result<Vec<Option<u8>>, PayloadError> {
        match self {
            TrueClass::Scalar(class) => {
                let class = checked_class(*class)?;
                Ok(vec![Some(class); batch_len])
            }
            TrueClass::PerInstance(classes) => {
                if classes.len() != batch_len {
                    return Err(PayloadError::TrueClassLength {
                        expected: batch_len,
                        actual: classes.len(),
                    });
                }
                classes
                    .iter()
                    .map(|&c| c.map(checked_class).transpose())
                    .collect()
            }
        }
    }
}

fn checked_class(class: i64) -> Result<u8, PayloadError> {
    match class {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(PayloadError::InvalidTrueClass(format!("expected 0 or 1, got {}", other))),
    }
}

/// Validated, normalized request
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    /// Uniform-width rows, non-finite values already replaced with 0
    pub instances: Vec<Vec<f32>>,

    /// One entry per instance
    pub true_class: Vec<Option<u8>>,
}

impl PredictRequest {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Parse a raw request body
    pub fn from_body(body: &[u8], feature_count: usize) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| PayloadError::NotJson)?;
        Self::from_value(value, feature_count)
    }

    /// Validate an already-decoded JSON document
    pub fn from_value(value: Value, feature_count: usize) -> Result<Self, PayloadError> {
        let Value::Object(mut payload) = value else {
            return Err(PayloadError::InvalidJson);
        };

        let instances = payload
            .remove("instances")
            .ok_or(PayloadError::MissingInstances)?;

        let Value::Array(rows) = instances else {
            return Err(PayloadError::InstancesNotList);
        };

        if rows.is_empty() {
            return Err(PayloadError::EmptyInstances);
        }

        let instances = parse_rows(rows, feature_count)?;

        let true_class = match payload.remove("true_class") {
            None | Some(Value::Null) => vec![None; instances.len()],
            Some(raw) => TrueClass::deserialize(&raw)
                .map_err(|_| {
                    PayloadError::InvalidTrueClass(format!("expected 0, 1, or a list of them, got {}", raw))
                })?
                .resolve(instances.len())?,
        };

        Ok(Self { instances, true_class })
    }
}

/// A flat list of numbers is a single instance; otherwise every element
/// must itself be a list.
fn parse_rows(rows: Vec<Value>, feature_count: usize) -> Result<Vec<Vec<f32>>, PayloadError> {
    let flat = rows.iter().all(|v| v.is_number() || v.is_null());
    if flat {
        return Ok(vec![parse_row(0, &rows, feature_count)?]);
    }

    rows.iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Array(cells) => parse_row(index, cells, feature_count),
            _ => Err(PayloadError::InvalidInstance { index }),
        })
        .collect()
}

fn parse_row(index: usize, cells: &[Value], feature_count: usize) -> Result<Vec<f32>, PayloadError> {
    if cells.len() != feature_count {
        return Err(PayloadError::WidthMismatch {
            index,
            expected: feature_count,
            actual: cells.len(),
        });
    }

    cells
        .iter()
        .enumerate()
        .map(|(position, cell)| match cell {
            Value::Null => Ok(0.0),
            Value::Number(n) => n
                .as_f64()
                .map(|v| sanitize(v as f32))
                .ok_or(PayloadError::NonNumeric { index, position }),
            _ => Err(PayloadError::NonNumeric { index, position }),
        })
        .collect()
}

/// NaN and ±Inf become 0
pub fn sanitize(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}
