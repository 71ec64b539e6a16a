//! Scalar telemetry sinks
//!
//! Published quality metrics are `(name, value, step)` tuples. The JSONL
//! sink is append-only and flushes after every batch of scalars.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("telemetry io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("telemetry encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One published scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scalar {
    pub name: String,
    pub value: f64,
    pub step: u64,
    pub wall_time: DateTime<Utc>,
}

impl Scalar {
    pub fn new(name: &str, value: f64, step: u64) -> Self {
        Self {
            name: name.to_string(),
            value,
            step,
            wall_time: Utc::now(),
        }
    }
}

/// Destination for published scalars
pub trait ScalarSink: Send + Sync {
    /// Publish every scalar of one step
    fn publish(&self, scalars: &[Scalar]) -> Result<(), SinkError>;
}

// ============================================================================
// JSONL FILE SINK
// ============================================================================

pub struct JsonlScalarSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlScalarSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        tracing::info!("Opened telemetry log: {:?}", path);

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl ScalarSink for JsonlScalarSink {
    fn publish(&self, scalars: &[Scalar]) -> Result<(), SinkError> {
        let mut writer = self.writer.lock();
        for scalar in scalars {
            serde_json::to_writer(&mut *writer, scalar)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// TRACING SINK
// ============================================================================

/// Logs scalars at info level
#[derive(Debug, Default)]
pub struct TracingScalarSink;

impl ScalarSink for TracingScalarSink {
    fn publish(&self, scalars: &[Scalar]) -> Result<(), SinkError> {
        for scalar in scalars {
            tracing::info!(
                target: "fraud_monitor::telemetry",
                name = %scalar.name,
                value = scalar.value,
                step = scalar.step,
                "scalar"
            );
        }
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY SINK
// ============================================================================

/// Keeps every scalar in memory
#[derive(Debug, Default)]
pub struct MemoryScalarSink {
    scalars: Mutex<Vec<Scalar>>,
}

impl MemoryScalarSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalars(&self) -> Vec<Scalar> {
        self.scalars.lock().clone()
    }

    /// Distinct steps in publish order
    pub fn steps(&self) -> Vec<u64> {
        let mut steps: Vec<u64> = Vec::new();
        for scalar in self.scalars.lock().iter() {
            if steps.last() != Some(&scalar.step) {
                steps.push(scalar.step);
            }
        }
        steps
    }
}

impl ScalarSink for MemoryScalarSink {
    fn publish(&self, scalars: &[Scalar]) -> Result<(), SinkError> {
        self.scalars.lock().extend_from_slice(scalars);
        Ok(())
    }
}
