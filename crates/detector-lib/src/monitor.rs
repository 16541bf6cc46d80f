//! Detector monitor loop
//!
//! Periodically polls a reading source and feeds every new reading through a
//! shared detector, recording metrics and structured events along the way.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::anomaly::StreamAnomalyDetector;
use crate::error::DetectorError;
use crate::models::Reading;
use crate::observability::{DetectorMetrics, StructuredLogger};
use crate::source::ReadingSource;

/// Detector shared between the monitor loop and snapshot readers
pub type SharedDetector = Arc<RwLock<StreamAnomalyDetector>>;

/// Configuration for the monitor loop
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between source polls (default: 1 second)
    pub poll_interval: Duration,
    /// Stop after this many readings have been accepted
    pub total_reads: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            total_reads: None,
        }
    }
}

/// Totals for a monitor run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub polls: u64,
    pub ingested: u64,
    pub anomalies: u64,
    /// Readings rejected by the detector (out of order, non-finite)
    pub rejected: u64,
    pub sink_failures: u64,
    pub source_errors: u64,
}

/// Loop that drives a detector from a reading source
pub struct MonitorLoop {
    source: Box<dyn ReadingSource>,
    detector: SharedDetector,
    config: MonitorConfig,
    metrics: DetectorMetrics,
    logger: StructuredLogger,
    summary: MonitorSummary,
}

impl MonitorLoop {
    pub fn new(
        source: Box<dyn ReadingSource>,
        detector: SharedDetector,
        config: MonitorConfig,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            source,
            detector,
            config,
            metrics: DetectorMetrics::new(),
            logger,
            summary: MonitorSummary::default(),
        }
    }

    /// Run until the read budget is exhausted or a shutdown signal arrives
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> MonitorSummary {
        info!(
            source = %self.source.describe(),
            interval_ms = self.config.poll_interval.as_millis(),
            total_reads = ?self.config.total_reads,
            "Starting detector monitor loop"
        );

        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.budget_exhausted() {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let accepted = self.poll_once().await;

                    if accepted > 0 {
                        debug!(
                            accepted = accepted,
                            elapsed_us = start.elapsed().as_micros(),
                            "Poll cycle complete"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down detector monitor loop");
                    break;
                }
            }
        }

        self.logger.log_summary(
            self.summary.ingested,
            self.summary.anomalies,
            self.summary.rejected,
        );
        self.summary
    }

    /// Poll the source once and ingest what it returned
    ///
    /// Returns the number of readings the detector accepted.
    pub async fn poll_once(&mut self) -> usize {
        self.summary.polls += 1;

        let mut readings = match self.source.poll().await {
            Ok(readings) => readings,
            Err(e) => {
                self.summary.source_errors += 1;
                self.metrics.inc_source_errors();
                warn!(source = %self.source.describe(), error = %e, "Failed to poll reading source");
                return 0;
            }
        };

        if let Some(remaining) = self.remaining_budget() {
            readings.truncate(remaining as usize);
        }

        if readings.is_empty() {
            return 0;
        }

        let shared = Arc::clone(&self.detector);
        let mut detector = shared.write().await;
        let mut accepted = 0;

        for reading in readings {
            if self.ingest_one(&mut detector, reading) {
                accepted += 1;
            }
        }

        self.metrics
            .set_window(detector.window().mean(), detector.window().std_dev());
        self.metrics.set_series_length(detector.series().len() as i64);

        accepted
    }

    pub fn summary(&self) -> &MonitorSummary {
        &self.summary
    }

    /// Ingest one reading, returning whether the detector accepted it
    fn ingest_one(&mut self, detector: &mut StreamAnomalyDetector, reading: Reading) -> bool {
        let phase_before = detector.phase();
        let start = Instant::now();
        let result = detector.ingest(reading);
        self.metrics
            .observe_ingest_latency(start.elapsed().as_secs_f64());

        let accepted = match result {
            Ok(verdict) => {
                if verdict.is_anomalous() {
                    self.record_anomaly(detector, &reading);
                }
                true
            }
            Err(DetectorError::OutOfOrderInput {
                timestamp,
                previous,
            }) => {
                self.summary.rejected += 1;
                self.metrics.inc_out_of_order();
                self.logger.log_out_of_order(timestamp, previous);
                false
            }
            Err(DetectorError::SinkWriteFailed {
                timestamp,
                value,
                source,
            }) => {
                // Classified and flagged; only the durable record is missing
                self.record_anomaly(detector, &reading);
                self.summary.sink_failures += 1;
                self.metrics.inc_sink_write_failures();
                self.logger
                    .log_sink_failure(timestamp, value, &source.to_string());
                true
            }
            Err(e) => {
                self.summary.rejected += 1;
                self.metrics.inc_rejected_readings();
                warn!(timestamp = reading.timestamp, error = %e, "Reading rejected");
                false
            }
        };

        if accepted {
            self.summary.ingested += 1;
            self.metrics.inc_readings_ingested();

            if detector.phase() != phase_before {
                self.logger
                    .log_phase_change(detector.phase(), detector.ingested());
            }
        }

        accepted
    }

    fn record_anomaly(&mut self, detector: &StreamAnomalyDetector, reading: &Reading) {
        self.summary.anomalies += 1;
        self.metrics.inc_anomalies_detected();
        self.logger.log_anomaly(
            reading,
            detector.window().mean(),
            detector.window().std_dev(),
            detector.config().tolerance,
        );
    }

    fn remaining_budget(&self) -> Option<u64> {
        self.config
            .total_reads
            .map(|total| total.saturating_sub(self.summary.ingested))
    }

    fn budget_exhausted(&self) -> bool {
        self.remaining_budget() == Some(0)
    }
}

/// Builder for creating the monitor loop
pub struct MonitorLoopBuilder {
    source: Option<Box<dyn ReadingSource>>,
    detector: Option<SharedDetector>,
    config: MonitorConfig,
    logger: Option<StructuredLogger>,
}

impl MonitorLoopBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            source: None,
            detector: None,
            config: MonitorConfig::default(),
            logger: None,
        }
    }

    /// Set the reading source
    pub fn source(mut self, source: Box<dyn ReadingSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the detector, already shared
    pub fn detector(mut self, detector: SharedDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Set the poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Stop after a number of accepted readings
    pub fn total_reads(mut self, total_reads: Option<u64>) -> Self {
        self.config.total_reads = total_reads;
        self
    }

    /// Set the structured logger
    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the monitor loop
    pub fn build(self) -> Result<MonitorLoop> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Reading source is required"))?;
        let detector = self
            .detector
            .ok_or_else(|| anyhow::anyhow!("Detector is required"))?;
        let logger = self
            .logger
            .unwrap_or_else(|| StructuredLogger::new("stream-detector"));

        Ok(MonitorLoop::new(source, detector, self.config, logger))
    }
}

impl Default for MonitorLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
