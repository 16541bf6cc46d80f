//! Streaming point anomaly detector
//!
//! Keeps running statistics over the trailing window of `W` readings and
//! classifies every reading once the window has filled, logging anomalous
//! readings to a sink.

use std::collections::VecDeque;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    AnomalySink, DetectorSnapshot, FileAnomalySink, Series, SnapshotPoint, VarianceMode,
    WindowState,
};
use crate::error::DetectorError;
use crate::models::{AnomalyVerdict, DetectorPhase, Reading};

/// Default trailing window size
const DEFAULT_WINDOW_SIZE: usize = 100;

/// Default tolerance (3 sigma)
const DEFAULT_TOLERANCE: f64 = 3.0;

/// Default anomaly log path
const DEFAULT_ANOMALY_LOG: &str = "anomaly.txt";

/// Detector configuration, fixed for the lifetime of a detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Number of readings in the trailing window (at least 2)
    pub window_size: usize,
    /// Number of standard deviations defining the threshold band
    pub tolerance: f64,
    /// Destination of the anomaly log
    pub anomaly_log: PathBuf,
    #[serde(default)]
    pub variance_mode: VarianceMode,
    /// Maximum number of readings kept for visualization
    #[serde(default)]
    pub history_limit: Option<usize>,
}

impl DetectorConfig {
    pub fn new(window_size: usize, tolerance: f64, anomaly_log: impl Into<PathBuf>) -> Self {
        Self {
            window_size,
            tolerance,
            anomaly_log: anomaly_log.into(),
            variance_mode: VarianceMode::default(),
            history_limit: None,
        }
    }

    pub fn with_variance_mode(mut self, mode: VarianceMode) -> Self {
        self.variance_mode = mode;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Check the configuration invariants
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.window_size < 2 {
            return Err(DetectorError::InvalidConfiguration(format!(
                "window size must be at least 2, got {}",
                self.window_size
            )));
        }

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(DetectorError::InvalidConfiguration(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }

        if self.history_limit == Some(0) {
            return Err(DetectorError::InvalidConfiguration(
                "history limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_TOLERANCE, DEFAULT_ANOMALY_LOG)
    }
}

/// Sliding-window point anomaly detector for a single scalar channel
///
/// Ingestion is strictly sequential: `ingest` takes `&mut self`, so callers
/// sharing a detector across tasks need their own lock around it.
pub struct StreamAnomalyDetector {
    config: DetectorConfig,
    window: WindowState,
    /// The readings currently inside the trailing window
    recent: VecDeque<Reading>,
    series: Series,
    sink: Box<dyn AnomalySink>,
    last_timestamp: Option<u64>,
    ingested: u64,
    anomalies: u64,
}

impl StreamAnomalyDetector {
    /// Create a detector logging anomalies to `config.anomaly_log`
    ///
    /// The log is created or truncated so every session starts empty.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;

        let sink = FileAnomalySink::create(&config.anomaly_log).map_err(|source| {
            DetectorError::SinkUnavailable {
                path: config.anomaly_log.clone(),
                source,
            }
        })?;

        Self::with_sink(config, Box::new(sink))
    }

    /// Create a detector recording anomalies to a caller-provided sink
    pub fn with_sink(
        config: DetectorConfig,
        sink: Box<dyn AnomalySink>,
    ) -> Result<Self, DetectorError> {
        config.validate()?;

        let series = match config.history_limit {
            Some(limit) => Series::with_retention(limit),
            None => Series::new(),
        };

        Ok(Self {
            window: WindowState::new(config.window_size, config.variance_mode),
            recent: VecDeque::with_capacity(config.window_size),
            series,
            sink,
            last_timestamp: None,
            ingested: 0,
            anomalies: 0,
            config,
        })
    }

    /// Ingest the next reading and classify it
    ///
    /// Rejected readings (out of order, non-finite) leave the detector
    /// untouched. A sink failure is returned as `SinkWriteFailed` after the
    /// reading has been classified and flagged; the flag stands.
    pub fn ingest(&mut self, reading: Reading) -> Result<AnomalyVerdict, DetectorError> {
        if let Some(previous) = self.last_timestamp {
            if reading.timestamp <= previous {
                return Err(DetectorError::OutOfOrderInput {
                    timestamp: reading.timestamp,
                    previous,
                });
            }
        }

        if !reading.value.is_finite() {
            return Err(DetectorError::NonFiniteValue {
                timestamp: reading.timestamp,
            });
        }

        self.series.push(reading);
        self.last_timestamp = Some(reading.timestamp);
        self.ingested += 1;

        if self.recent.len() < self.config.window_size {
            self.window.admit(reading.value);
        } else if let Some(outgoing) = self.recent.pop_front() {
            self.window.slide(outgoing.value, reading.value);
        }
        self.recent.push_back(reading);

        if self.ingested < self.config.window_size as u64 {
            debug!(
                timestamp = reading.timestamp,
                value = reading.value,
                ingested = self.ingested,
                "Window warming up"
            );
            return Ok(AnomalyVerdict::NotYetEvaluable);
        }

        if !self.window.is_outlier(reading.value, self.config.tolerance) {
            debug!(
                timestamp = reading.timestamp,
                value = reading.value,
                mean = self.window.mean(),
                std_dev = self.window.std_dev(),
                "Reading within tolerance"
            );
            return Ok(AnomalyVerdict::Normal);
        }

        self.series.flag_last();
        self.anomalies += 1;

        debug!(
            timestamp = reading.timestamp,
            value = reading.value,
            mean = self.window.mean(),
            std_dev = self.window.std_dev(),
            tolerance = self.config.tolerance,
            "Reading outside tolerance band"
        );

        self.sink
            .record(&reading)
            .map_err(|source| DetectorError::SinkWriteFailed {
                timestamp: reading.timestamp,
                value: reading.value,
                source,
            })?;

        Ok(AnomalyVerdict::Anomalous)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Current window statistics
    pub fn window(&self) -> &WindowState {
        &self.window
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn phase(&self) -> DetectorPhase {
        if self.ingested >= self.config.window_size as u64 {
            DetectorPhase::Steady
        } else {
            DetectorPhase::WarmingUp
        }
    }

    /// Total readings accepted
    pub fn ingested(&self) -> u64 {
        self.ingested
    }

    /// Total readings classified as anomalous
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    /// Copy the state a visualizer needs, keeping at most `limit` points
    pub fn snapshot(&self, limit: Option<usize>) -> DetectorSnapshot {
        let len = self.series.len();
        let skip = limit.map(|l| len.saturating_sub(l)).unwrap_or(0);
        let points = self
            .series
            .iter()
            .skip(skip)
            .map(|(reading, flagged)| SnapshotPoint {
                timestamp: reading.timestamp,
                value: reading.value,
                flagged,
            })
            .collect();

        let (lower_band, upper_band) = self.window.bands(self.config.tolerance);

        DetectorSnapshot {
            points,
            mean: self.window.mean(),
            variance: self.window.variance(),
            std_dev: self.window.std_dev(),
            tolerance: self.config.tolerance,
            lower_band,
            upper_band,
            window_size: self.config.window_size,
            window_start: self.recent.front().map(|r| r.timestamp),
            phase: self.phase(),
            ingested: self.ingested,
            anomalies: self.anomalies,
            generated_at: chrono::Utc::now().timestamp(),
        }
    }
}
