//! Offline replay of a data file through a fresh detector

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use detector_lib::source::parse_line;
use detector_lib::{
    AnomalyVerdict, DetectorConfig, DetectorError, MemorySink, StreamAnomalyDetector,
};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{format_value, print_info, print_table, print_warning, OutputFormat};
use crate::DetectorArgs;

/// Row for the anomalies table
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct AnomalyRow {
    #[tabled(rename = "Timestamp")]
    pub timestamp: u64,
    #[tabled(rename = "Value", display_with = "display_value")]
    pub value: f64,
    #[tabled(rename = "Mean", display_with = "display_value")]
    pub mean: f64,
    #[tabled(rename = "Lower", display_with = "display_value")]
    pub lower_band: f64,
    #[tabled(rename = "Upper", display_with = "display_value")]
    pub upper_band: f64,
    /// Distance from the mean in standard deviations
    #[tabled(rename = "Sigmas", display_with = "display_value")]
    pub sigmas: f64,
}

fn display_value(value: &f64) -> String {
    format_value(*value)
}

/// Totals for one replay
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub readings: u64,
    pub evaluated: u64,
    /// Lines that could not be parsed
    pub skipped_lines: u64,
    /// Readings refused by the detector (out of order, non-finite)
    pub rejected: u64,
    pub sink_failures: u64,
    pub final_mean: f64,
    pub final_std_dev: f64,
    pub anomalies: Vec<AnomalyRow>,
}

/// Feed every line of `content` into `detector`
pub fn replay(detector: &mut StreamAnomalyDetector, content: &str) -> ScanReport {
    let mut report = ScanReport::default();
    let tolerance = detector.config().tolerance;

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let reading = match parse_line(line) {
            Ok(reading) => reading,
            Err(_) => {
                report.skipped_lines += 1;
                continue;
            }
        };

        let anomalous = match detector.ingest(reading) {
            Ok(verdict) => {
                report.readings += 1;
                if verdict.is_evaluated() {
                    report.evaluated += 1;
                }
                verdict == AnomalyVerdict::Anomalous
            }
            Err(DetectorError::SinkWriteFailed { .. }) => {
                report.readings += 1;
                report.evaluated += 1;
                report.sink_failures += 1;
                true
            }
            Err(_) => {
                report.rejected += 1;
                false
            }
        };

        if anomalous {
            let window = detector.window();
            let (lower_band, upper_band) = window.bands(tolerance);
            let sigmas = if window.std_dev() > 0.0 {
                (reading.value - window.mean()) / window.std_dev()
            } else {
                f64::INFINITY.copysign(reading.value - window.mean())
            };

            report.anomalies.push(AnomalyRow {
                timestamp: reading.timestamp,
                value: reading.value,
                mean: window.mean(),
                lower_band,
                upper_band,
                sigmas,
            });
        }
    }

    report.final_mean = detector.window().mean();
    report.final_std_dev = detector.window().std_dev();
    report
}

/// Replay `file` and print the anomalies found
pub async fn scan_file(
    file: &Path,
    args: &DetectorArgs,
    anomaly_log: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let config = DetectorConfig::new(
        args.window_size,
        args.tolerance,
        anomaly_log.unwrap_or_else(|| Path::new("")),
    )
    .with_variance_mode(args.variance_mode.into());

    let mut detector = match anomaly_log {
        Some(_) => StreamAnomalyDetector::new(config),
        None => StreamAnomalyDetector::with_sink(config, Box::new(MemorySink::new())),
    }
    .context("Failed to initialize detector")?;

    let report = replay(&mut detector, &content);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{}", "Scan Results".bold());
            println!("{}", "=".repeat(50));
            println!("File:        {}", file.display().to_string().cyan());
            println!("Window:      {}", args.window_size);
            println!("Tolerance:   {}σ", args.tolerance);
            println!();

            print_table(&report.anomalies, format);

            println!();
            println!(
                "Readings: {}  Evaluated: {}  Anomalies: {}",
                report.readings,
                report.evaluated,
                report.anomalies.len().to_string().red()
            );
            println!(
                "Final window: mean {}  std dev {}",
                format_value(report.final_mean),
                format_value(report.final_std_dev)
            );

            if report.skipped_lines > 0 {
                print_warning(&format!("Skipped {} malformed lines", report.skipped_lines));
            }
            if report.rejected > 0 {
                print_warning(&format!(
                    "Rejected {} readings (out of order or non-finite)",
                    report.rejected
                ));
            }
            if report.sink_failures > 0 {
                print_warning(&format!(
                    "{} anomalies could not be written to the log",
                    report.sink_failures
                ));
            }
            if let Some(path) = anomaly_log {
                print_info(&format!("Anomaly log written to {}", path.display()));
            }
        }
    }

    Ok(())
}
