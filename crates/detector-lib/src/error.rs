//! Error types for the detector and its sources

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`StreamAnomalyDetector`](crate::StreamAnomalyDetector)
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Out-of-order input: timestamp {timestamp} is not after {previous}")]
    OutOfOrderInput { timestamp: u64, previous: u64 },

    #[error("Non-finite value at timestamp {timestamp}")]
    NonFiniteValue { timestamp: u64 },

    #[error("Failed to record anomaly ({timestamp}, {value}): {source}")]
    SinkWriteFailed {
        timestamp: u64,
        value: f64,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open anomaly log {path:?}: {source}")]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by reading sources
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record {line:?}: {reason}")]
    Malformed { line: String, reason: String },

    #[error("Invalid stream parameters: {0}")]
    InvalidParameters(String),
}
