//! Point anomaly detection over a scalar stream
//!
//! This module provides:
//! - Trailing window statistics with O(1) updates
//! - The streaming detector and its configuration
//! - Anomaly sinks (log file, in-memory)
//! - Read-only snapshots for visualizers

mod detector;
mod series;
mod sink;
mod snapshot;
mod window;


pub use detector::{DetectorConfig, StreamAnomalyDetector};
pub use series::Series;
pub use sink::{AnomalySink, FileAnomalySink, MemorySink};
pub use snapshot::{DetectorSnapshot, SnapshotPoint};
pub use window::{VarianceMode, WindowState};
