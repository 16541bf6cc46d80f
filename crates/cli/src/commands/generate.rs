//! Synthetic stream generation

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use detector_lib::{StreamParams, StreamWriter, SyntheticStream};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::output::{print_info, print_success, print_warning, OutputFormat};
use crate::StreamShape;

#[derive(Debug, Serialize)]
struct GenerateResult {
    output: String,
    written: u64,
    requested: u64,
    interrupted: bool,
}

impl From<StreamShape> for StreamParams {
    fn from(shape: StreamShape) -> Self {
        StreamParams {
            base_value: shape.base_value,
            trend_slope: shape.trend_slope,
            seasonal_period: shape.seasonal_period,
            noise_level: shape.noise_level,
            anomaly_level: shape.anomaly_level,
            anomaly_chance: shape.anomaly_chance,
        }
    }
}

/// Write a synthetic stream into `output` until `total` readings or Ctrl-C
pub async fn generate(
    output: &Path,
    interval_ms: u64,
    total: u64,
    seed: Option<u64>,
    shape: StreamShape,
    format: OutputFormat,
) -> Result<()> {
    let params = StreamParams::from(shape);
    let stream = match seed {
        Some(seed) => SyntheticStream::seeded(params, seed),
        None => SyntheticStream::new(params),
    }
    .context("Invalid stream parameters")?;

    let writer = StreamWriter::new(output)
        .with_interval(Duration::from_millis(interval_ms))
        .with_total_writes(total);

    if let OutputFormat::Table = format {
        print_info(&format!(
            "Writing {} readings to {} every {}ms (Ctrl-C to stop)",
            total,
            output.display(),
            interval_ms
        ));
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let written = writer.run(stream, shutdown_rx).await?;
    signal_task.abort();

    let result = GenerateResult {
        output: output.display().to_string(),
        written,
        requested: total,
        interrupted: written < total,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            if result.interrupted {
                print_warning(&format!(
                    "Stopped after {} of {} readings",
                    result.written, result.requested
                ));
            } else {
                print_success(&format!("Wrote {} readings to {}", result.written, result.output));
            }
        }
    }

    Ok(())
}
