//! Observability infrastructure for the stream detector
//!
//! Provides:
//! - Prometheus metrics (ingest latency, verdict counters, window statistics)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge, Gauge,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::models::{DetectorPhase, Reading};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.000001, 0.000005, 0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DetectorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct DetectorMetricsInner {
    ingest_latency_seconds: Histogram,
    readings_ingested: IntCounter,
    anomalies_detected: IntCounter,
    out_of_order_rejections: IntCounter,
    rejected_readings: IntCounter,
    sink_write_failures: IntCounter,
    source_errors: IntCounter,
    window_mean: Gauge,
    window_std_dev: Gauge,
    series_length: IntGauge,
}

impl DetectorMetricsInner {
    fn new() -> Self {
        Self {
            ingest_latency_seconds: register_histogram!(
                "stream_detector_ingest_latency_seconds",
                "Time spent ingesting and classifying a single reading",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register ingest_latency_seconds"),

            readings_ingested: register_int_counter!(
                "stream_detector_readings_ingested_total",
                "Total number of readings accepted by the detector"
            )
            .expect("Failed to register readings_ingested"),

            anomalies_detected: register_int_counter!(
                "stream_detector_anomalies_detected_total",
                "Total number of readings classified as anomalous"
            )
            .expect("Failed to register anomalies_detected"),

            out_of_order_rejections: register_int_counter!(
                "stream_detector_out_of_order_total",
                "Total number of readings rejected for a non-increasing timestamp"
            )
            .expect("Failed to register out_of_order_rejections"),

            rejected_readings: register_int_counter!(
                "stream_detector_rejected_readings_total",
                "Total number of readings rejected for a non-finite value"
            )
            .expect("Failed to register rejected_readings"),

            sink_write_failures: register_int_counter!(
                "stream_detector_sink_write_failures_total",
                "Total number of anomaly log writes that failed"
            )
            .expect("Failed to register sink_write_failures"),

            source_errors: register_int_counter!(
                "stream_detector_source_errors_total",
                "Total number of errors while polling the reading source"
            )
            .expect("Failed to register source_errors"),

            window_mean: register_gauge!(
                "stream_detector_window_mean",
                "Running mean of the trailing window"
            )
            .expect("Failed to register window_mean"),

            window_std_dev: register_gauge!(
                "stream_detector_window_std_dev",
                "Running standard deviation of the trailing window"
            )
            .expect("Failed to register window_std_dev"),

            series_length: register_int_gauge!(
                "stream_detector_series_length",
                "Number of readings retained for visualization"
            )
            .expect("Failed to register series_length"),
        }
    }
}

/// Detector metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct DetectorMetrics {
    _private: (),
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DetectorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record an ingest latency observation
    pub fn observe_ingest_latency(&self, duration_secs: f64) {
        self.inner().ingest_latency_seconds.observe(duration_secs);
    }

    pub fn inc_readings_ingested(&self) {
        self.inner().readings_ingested.inc();
    }

    pub fn inc_anomalies_detected(&self) {
        self.inner().anomalies_detected.inc();
    }

    pub fn inc_out_of_order(&self) {
        self.inner().out_of_order_rejections.inc();
    }

    pub fn inc_rejected_readings(&self) {
        self.inner().rejected_readings.inc();
    }

    pub fn inc_sink_write_failures(&self) {
        self.inner().sink_write_failures.inc();
    }

    pub fn inc_source_errors(&self) {
        self.inner().source_errors.inc();
    }

    /// Update window statistics gauges
    pub fn set_window(&self, mean: f64, std_dev: f64) {
        self.inner().window_mean.set(mean);
        self.inner().window_std_dev.set(std_dev);
    }

    pub fn set_series_length(&self, len: i64) {
        self.inner().series_length.set(len);
    }
}

/// Structured logger for detector events
///
/// Provides consistent JSON-formatted logging for anomalies, rejected
/// input and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log detector startup
    pub fn log_startup(&self, version: &str, window_size: usize, tolerance: f64) {
        info!(
            event = "detector_started",
            instance = %self.instance,
            version = %version,
            window_size = window_size,
            tolerance = tolerance,
            "Stream detector started"
        );
    }

    /// Log an anomalous reading
    pub fn log_anomaly(&self, reading: &Reading, mean: f64, std_dev: f64, tolerance: f64) {
        let deviation = if std_dev > 0.0 {
            (reading.value - mean) / std_dev
        } else {
            0.0
        };

        warn!(
            event = "anomaly_detected",
            instance = %self.instance,
            timestamp = reading.timestamp,
            value = reading.value,
            mean = mean,
            std_dev = std_dev,
            deviation_sigmas = deviation,
            tolerance = tolerance,
            "Anomaly detected"
        );
    }

    /// Log the one-way transition out of warm-up
    pub fn log_phase_change(&self, phase: DetectorPhase, ingested: u64) {
        info!(
            event = "phase_changed",
            instance = %self.instance,
            phase = %phase,
            ingested = ingested,
            "Detector window is full, classification started"
        );
    }

    /// Log a reading rejected for a non-increasing timestamp
    pub fn log_out_of_order(&self, timestamp: u64, previous: u64) {
        warn!(
            event = "out_of_order_input",
            instance = %self.instance,
            timestamp = timestamp,
            previous = previous,
            "Reading rejected, timestamp not after previous reading"
        );
    }

    /// Log a failed anomaly log write
    pub fn log_sink_failure(&self, timestamp: u64, value: f64, error: &str) {
        error!(
            event = "sink_write_failed",
            instance = %self.instance,
            timestamp = timestamp,
            value = value,
            error = %error,
            "Failed to record anomaly, in-memory flag kept"
        );
    }

    /// Log the totals of a finished monitor run
    pub fn log_summary(&self, ingested: u64, anomalies: u64, rejected: u64) {
        info!(
            event = "monitor_summary",
            instance = %self.instance,
            ingested = ingested,
            anomalies = anomalies,
            rejected = rejected,
            "Monitor loop finished"
        );
    }

    /// Log detector shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "detector_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Stream detector shutting down"
        );
    }
}
