//! Stream detector - sliding-window anomaly detection daemon
//!
//! Tails a data file (or an in-process synthetic stream), classifies every
//! reading against its trailing window and appends anomalies to a log.
//! Health, metrics and snapshots are served over HTTP.

use anyhow::{Context, Result};
use detector_lib::{
    DetectorMetrics, MonitorLoopBuilder, MonitorSummary, SharedDetector, StreamAnomalyDetector,
    StructuredLogger,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const DETECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting stream-detector");

    // Load configuration
    let config_path = std::env::var_os("DETECTOR_CONFIG").map(PathBuf::from);
    let config = config::DaemonConfig::load(config_path.as_deref())?;
    info!(
        instance = %config.instance_name,
        source = ?config.source,
        data_file = %config.data_file.display(),
        anomaly_log = %config.anomaly_log.display(),
        "Detector configured"
    );

    // Open the anomaly log and build the detector
    let detector_config = config.detector_config();
    let detector = StreamAnomalyDetector::new(detector_config)
        .context("Failed to initialize detector")?;
    let shared: SharedDetector = Arc::new(RwLock::new(detector));

    let metrics = DetectorMetrics::new();

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(DETECTOR_VERSION, config.window_size, config.tolerance);

    // Start health, metrics and snapshot server
    let app_state = Arc::new(api::AppState::new(shared.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let monitor = MonitorLoopBuilder::new()
        .source(config.build_source()?)
        .detector(shared.clone())
        .poll_interval(config.poll_interval())
        .total_reads(config.total_reads)
        .logger(logger.clone())
        .build()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut monitor_handle = tokio::spawn(monitor.run(shutdown_rx));

    let summary: MonitorSummary = tokio::select! {
        result = &mut monitor_handle => {
            let summary = result.context("Monitor loop panicked")?;
            info!(
                ingested = summary.ingested,
                "Read budget exhausted, serving final snapshot until interrupted"
            );

            tokio::signal::ctrl_c().await?;
            logger.log_shutdown("read budget exhausted");
            summary
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");

            // The loop may already be gone if it finished in the same instant
            let _ = shutdown_tx.send(());
            monitor_handle.await.context("Monitor loop panicked")?
        }
    };

    api_handle.abort();

    let detector = shared.read().await;
    info!(
        polls = summary.polls,
        ingested = detector.ingested(),
        anomalies = detector.anomalies(),
        rejected = summary.rejected,
        sink_failures = summary.sink_failures,
        source_errors = summary.source_errors,
        "Shutting down"
    );

    Ok(())
}
