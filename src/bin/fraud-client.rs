//! Operator client for the fraud monitor
//!
//! `single` scores one transaction typed on the command line, `batch` scores
//! a CSV file and writes the predictions next to the inputs.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use fraud_monitor::client::{parse_feature_line, read_batch_csv, write_results_csv, FraudClient};
use fraud_monitor::config::DEFAULT_FEATURE_COUNT;
use fraud_monitor::gateway::TrueClass;

/// Sample transaction used when no values are given
const SAMPLE_TRANSACTION: &str = "0.141249,-0.424929,1.277256,0.826234,3.362354,-0.524808,1.422853,\
-0.772826,-3.448767,-0.175739,1.201940,-0.136026,-2.776001,2.117868,\
1.727262,0.143567,0.041977,1.368740,0.874010,0.636302,-1.011640,\
5.279042,-0.680475,-1.213349,-0.037629,2.945911,2.019410,1.011748,\
0.405797,0.371406,1.251474,-1.716841,3.293063";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fraud monitor base URL
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Expected number of features per transaction
    #[arg(long, default_value_t = DEFAULT_FEATURE_COUNT)]
    features: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one comma-separated transaction
    Single {
        #[arg(default_value = SAMPLE_TRANSACTION)]
        values: String,

        /// Known class (0 or 1) for monitoring
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..=1))]
        true_class: Option<i64>,
    },
    /// Score every row of a CSV file
    Batch {
        input: PathBuf,

        /// Results CSV (defaults to <input>_predictions.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that the server is up
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraud_client=info,fraud_monitor=info".into()),
        )
        .with_target(false)
        .init();

    let client = FraudClient::new(args.url.clone(), Duration::from_secs(args.timeout))?;

    match args.command {
        Command::Single { values, true_class } => {
            let line = parse_feature_line(&values, args.features)?;
            if line.sanitized {
                warn!("NaN or Inf detected in input, replacing with 0");
            }

            let true_class = true_class.map(TrueClass::Scalar);
            let response = client
                .predict(std::slice::from_ref(&line.values), true_class.as_ref())
                .await
                .context("Prediction request failed")?;

            for (label, probability) in response.predictions.iter().zip(&response.probabilities) {
                println!("Prediction: {} (probability {:.4})", label, probability);
            }
            println!("Latency: {:.3}s", response.latency);
        }
        Command::Batch { input, output } => {
            let file = File::open(&input)
                .with_context(|| format!("Failed to open {:?}", input))?;
            let batch = read_batch_csv(file)?;

            if batch.dropped > 0 {
                warn!("Dropped {} rows with non-numeric values", batch.dropped);
            }
            if batch.sanitized > 0 {
                warn!("Replaced {} infinite values with 0", batch.sanitized);
            }
            info!(
                "Sending {} rows{}",
                batch.rows.len(),
                if batch.labels.is_some() { " with ground truth" } else { "" }
            );

            let true_class = batch.true_class();
            let response = client
                .predict(&batch.rows, true_class.as_ref())
                .await
                .context("Batch prediction request failed")?;

            let output = output.unwrap_or_else(|| default_output(&input));
            let writer = BufWriter::new(
                File::create(&output).with_context(|| format!("Failed to create {:?}", output))?,
            );
            write_results_csv(writer, &batch, &response)?;

            let flagged = response.predictions.iter().filter(|p| p.is_positive()).count();
            println!(
                "Scored {} rows ({} flagged as fraud) in {:.3}s",
                batch.rows.len(),
                flagged,
                response.latency
            );
            println!("Results written to {}", output.display());
        }
        Command::Health => {
            let health = client.health().await.context("Health check failed")?;
            println!(
                "{} v{} [{}] (backend {}, {} features)",
                health.status,
                health.version,
                health.environment,
                health.inference_backend,
                health.feature_count
            );
        }
    }

    Ok(())
}

fn default_output(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "batch".to_string());
    input.with_file_name(format!("{}_predictions.csv", stem))
}
