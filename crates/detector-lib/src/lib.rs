//! Streaming anomaly detection library
//!
//! This crate provides the core functionality for:
//! - Sliding-window point anomaly detection over a scalar stream
//! - Anomaly logging to an append-only sink
//! - Reading sources (file tail, synthetic generator) and the stream writer
//! - The monitor loop that drives a detector from a source
//! - Metrics and structured logging

pub mod anomaly;
pub mod error;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod source;

pub use anomaly::{
    AnomalySink, DetectorConfig, DetectorSnapshot, FileAnomalySink, MemorySink, Series,
    SnapshotPoint, StreamAnomalyDetector, VarianceMode, WindowState,
};
pub use error::{DetectorError, SourceError};
pub use models::*;
pub use monitor::{
    MonitorConfig, MonitorLoop, MonitorLoopBuilder, MonitorSummary, SharedDetector,
};
pub use observability::{DetectorMetrics, StructuredLogger};
pub use source::{
    FileTailSource, ReadingSource, StreamParams, StreamWriter, SyntheticSource, SyntheticStream,
};
