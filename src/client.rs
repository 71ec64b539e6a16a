//! Operator client
//!
//! Collects single transactions or CSV batches, sends them to `/predict`
//! and turns the response into something an operator can read or download.

use std::io::{Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gateway::payload::sanitize;
use crate::gateway::{PredictResponse, TrueClass};
use crate::handlers::health::HealthResponse;

/// Ground-truth column in uploaded CSVs
pub const LABEL_COLUMN: &str = "Class";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not parse {0:?} as a number")]
    Parse(String),

    #[error("you must enter exactly {expected} values, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("invalid '{LABEL_COLUMN}' value {0:?} (expected 0 or 1)")]
    InvalidLabel(String),

    #[error("no usable rows in CSV")]
    EmptyBatch,

    #[error("server returned {predictions} predictions for {rows} rows")]
    Mismatch { rows: usize, predictions: usize },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// INPUT PARSING
// ============================================================================

/// One parsed transaction
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLine {
    pub values: Vec<f32>,
    /// At least one NaN/Inf was replaced with 0
    pub sanitized: bool,
}

/// Parse comma-separated feature values
pub fn parse_feature_line(input: &str, feature_count: usize) -> Result<FeatureLine, ClientError> {
    let values = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f32>().map_err(|_| ClientError::Parse(s.to_string())))
        .collect::<Result<Vec<f32>, _>>()?;

    if values.len() != feature_count {
        return Err(ClientError::FeatureCount {
            expected: feature_count,
            actual: values.len(),
        });
    }

    let sanitized = values.iter().any(|v| !v.is_finite());
    let values = values
        .into_iter()
        .map(sanitize)
        .collect();

    Ok(FeatureLine { values, sanitized })
}

/// Rows read from an uploaded CSV
#[derive(Debug, Clone, PartialEq)]
pub struct CsvBatch {
    /// Feature column names
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f32>>,
    /// Present when the CSV had a label column
    pub labels: Option<Vec<i64>>,
    /// Rows skipped because a feature was not numeric
    pub dropped: usize,
    /// Infinite cells replaced with 0
    pub sanitized: usize,
}

impl CsvBatch {
    pub fn true_class(&self) -> Option<TrueClass> {
        self.labels
            .as_ref()
            .map(|labels| TrueClass::PerInstance(labels.iter().copied().map(Some).collect()))
    }
}

/// Read a CSV with a header row. A `Class` column is split off as ground
/// truth; rows with non-numeric features are dropped together with their
/// label. Infinite cells become 0, as on the single-transaction path.
pub fn read_batch_csv<R: Read>(reader: R) -> Result<CsvBatch, ClientError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let header_record = csv_reader.headers()?.clone();

    let label_index = header_record.iter().position(|h| h.trim() == LABEL_COLUMN);
    let headers: Vec<String> = header_record
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != label_index)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut rows = Vec::new();
    let mut labels = label_index.map(|_| Vec::new());
    let mut dropped = 0;
    let mut sanitized = 0;

    for record in csv_reader.records() {
        let record = record?;

        let features: Option<Vec<f32>> = record
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != label_index)
            .map(|(_, cell)| cell.trim().parse::<f32>().ok().filter(|v| !v.is_nan()))
            .collect();

        let Some(mut features) = features else {
            dropped += 1;
            continue;
        };

        for value in features.iter_mut().filter(|v| v.is_infinite()) {
            *value = sanitize(*value);
            sanitized += 1;
        }

        if let (Some(index), Some(labels)) = (label_index, labels.as_mut()) {
            let raw = record.get(index).unwrap_or("").trim();
            let label = raw
                .parse::<f64>()
                .ok()
                .filter(|v| *v == 0.0 || *v == 1.0)
                .ok_or_else(|| ClientError::InvalidLabel(raw.to_string()))?;
            labels.push(label as i64);
        }

        rows.push(features);
    }

    if rows.is_empty() {
        return Err(ClientError::EmptyBatch);
    }

    Ok(CsvBatch {
        headers,
        rows,
        labels,
        dropped,
        sanitized,
    })
}

/// Write the batch back out with `Prediction` and `Probability` columns
pub fn write_results_csv<W: Write>(
    writer: W,
    batch: &CsvBatch,
    response: &PredictResponse,
) -> Result<(), ClientError> {
    if response.predictions.len() != batch.rows.len() || response.probabilities.len() != batch.rows.len() {
        return Err(ClientError::Mismatch {
            rows: batch.rows.len(),
            predictions: response.predictions.len(),
        });
    }

    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = batch.headers.clone();
    header.push("Prediction".to_string());
    header.push("Probability".to_string());
    wtr.write_record(&header)?;

    for ((row, label), probability) in batch.rows.iter().zip(&response.predictions).zip(&response.probabilities) {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(label.to_string());
        record.push(probability.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

// ============================================================================
// HTTP CLIENT
// ============================================================================

#[derive(Debug, Serialize)]
struct PredictPayload<'a> {
    instances: &'a [Vec<f32>],
    #[serde(skip_serializing_if = "Option::is_none")]
    true_class: Option<&'a TrueClass>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// `/predict` API client
pub struct FraudClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl FraudClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Check server health
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Score a batch
    pub async fn predict(
        &self,
        instances: &[Vec<f32>],
        true_class: Option<&TrueClass>,
    ) -> Result<PredictResponse, ClientError> {
        let response = self.http_client
            .post(format!("{}/predict", self.base_url))
            .json(&PredictPayload { instances, true_class })
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text);

        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Label;

    #[test]
    fn test_parse_feature_line() {
        let line = parse_feature_line("0.5, -1.25,3,", 3).unwrap();
        assert_eq!(line.values, vec![0.5, -1.25, 3.0]);
        assert!(!line.sanitized);

        let line = parse_feature_line("NaN,inf,1", 3).unwrap();
        assert_eq!(line.values, vec![0.0, 0.0, 1.0]);
        assert!(line.sanitized);
    }

    #[test]
    fn test_parse_feature_line_errors() {
        assert!(matches!(
            parse_feature_line("1,2", 3),
            Err(ClientError::FeatureCount { expected: 3, actual: 2 })
        ));
        assert!(matches!(parse_feature_line("1,x,3", 3), Err(ClientError::Parse(_))));
    }

    #[test]
    fn test_read_csv_with_labels() {
        let data = "V1,V2,Class\n0.1,0.2,0\nbad,0.3,1\n0.4,0.5,1\n";
        let batch = read_batch_csv(data.as_bytes()).unwrap();

        assert_eq!(batch.headers, vec!["V1", "V2"]);
        assert_eq!(batch.rows, vec![vec![0.1, 0.2], vec![0.4, 0.5]]);
        assert_eq!(batch.labels, Some(vec![0, 1]));
        assert_eq!(batch.dropped, 1);
        assert_eq!(batch.sanitized, 0);
        assert_eq!(batch.true_class(), Some(TrueClass::PerInstance(vec![Some(0), Some(1)])));
    }

    #[test]
    fn test_read_csv_zeroes_infinite_cells() {
        let data = "V1,V2,Class\ninf,0.2,1\n0.3,-inf,0\nNaN,0.5,1\n";
        let batch = read_batch_csv(data.as_bytes()).unwrap();

        assert_eq!(batch.rows, vec![vec![0.0, 0.2], vec![0.3, 0.0]]);
        assert_eq!(batch.labels, Some(vec![1, 0]));
        assert_eq!(batch.sanitized, 2);
        assert_eq!(batch.dropped, 1);
        assert!(batch.rows.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_read_csv_without_labels() {
        let batch = read_batch_csv("a,b\n1,2\n".as_bytes()).unwrap();
        assert_eq!(batch.labels, None);
        assert_eq!(batch.true_class(), None);

        assert!(matches!(read_batch_csv("a,b\nx,y\n".as_bytes()), Err(ClientError::EmptyBatch)));
        assert!(matches!(
            read_batch_csv("a,Class\n1,7\n".as_bytes()),
            Err(ClientError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_write_results_csv() {
        let batch = read_batch_csv("V1,V2\n0.1,0.2\n0.3,0.4\n".as_bytes()).unwrap();
        let response = PredictResponse {
            predictions: vec![Label::NotFraud, Label::Fraud],
            probabilities: vec![0.25, 0.75],
            latency: 0.1,
        };

        let mut out = Vec::new();
        write_results_csv(&mut out, &batch, &response).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "V1,V2,Prediction,Probability");
        assert_eq!(lines[1], "0.1,0.2,Not Fraud,0.25");
        assert_eq!(lines[2], "0.3,0.4,Fraud,0.75");
    }

    #[test]
    fn test_write_results_rejects_mismatch() {
        let batch = read_batch_csv("V1\n0.1\n0.2\n".as_bytes()).unwrap();
        let response = PredictResponse {
            predictions: vec![Label::Fraud],
            probabilities: vec![0.9],
            latency: 0.1,
        };
        assert!(matches!(
            write_results_csv(Vec::new(), &batch, &response),
            Err(ClientError::Mismatch { rows: 2, predictions: 1 })
        ));
    }
}
