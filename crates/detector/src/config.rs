//! Detector daemon configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use detector_lib::{
    DetectorConfig, FileTailSource, ReadingSource, StreamParams, SyntheticSource, SyntheticStream,
    VarianceMode,
};
use serde::Deserialize;

/// Where readings come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Tail the data file written by `streamctl generate`
    #[default]
    File,
    /// Generate readings in-process
    Synthetic,
}

/// Daemon configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics/snapshot
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default)]
    pub source: SourceKind,

    /// Data file tailed when `source = file`
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Anomaly log, truncated at startup
    #[serde(default = "default_anomaly_log")]
    pub anomaly_log: PathBuf,

    /// Trailing window size
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Tolerance in standard deviations
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default)]
    pub variance_mode: VarianceMode,

    /// Maximum readings retained for the snapshot endpoint
    #[serde(default)]
    pub history_limit: Option<usize>,

    /// Source poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Stop ingesting after this many readings
    #[serde(default)]
    pub total_reads: Option<u64>,

    /// Synthetic stream shape when `source = synthetic`
    #[serde(default)]
    pub synthetic: StreamParams,

    /// Seed for the synthetic stream
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "stream-detector".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data.txt")
}

fn default_anomaly_log() -> PathBuf {
    PathBuf::from("anomaly.txt")
}

fn default_window_size() -> usize {
    100
}

fn default_tolerance() -> f64 {
    3.0
}

fn default_poll_interval() -> u64 {
    1000
}

impl DaemonConfig {
    /// Load configuration from an optional file overlaid with `DETECTOR_*`
    /// environment variables (nested keys use `__`, e.g.
    /// `DETECTOR_SYNTHETIC__NOISE_LEVEL`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("DETECTOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Detector settings derived from this configuration
    pub fn detector_config(&self) -> DetectorConfig {
        let mut detector = DetectorConfig::new(self.window_size, self.tolerance, &self.anomaly_log)
            .with_variance_mode(self.variance_mode);

        if let Some(limit) = self.history_limit {
            detector = detector.with_history_limit(limit);
        }

        detector
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Build the configured reading source
    pub fn build_source(&self) -> Result<Box<dyn ReadingSource>> {
        match self.source {
            SourceKind::File => Ok(Box::new(FileTailSource::new(&self.data_file))),
            SourceKind::Synthetic => {
                let stream = match self.seed {
                    Some(seed) => SyntheticStream::seeded(self.synthetic.clone(), seed),
                    None => SyntheticStream::new(self.synthetic.clone()),
                }
                .context("Invalid synthetic stream parameters")?;

                Ok(Box::new(SyntheticSource::new(stream)))
            }
        }
    }
}
