//! Reading sources feeding the detector
//!
//! This module provides:
//! - The `ReadingSource` trait polled by the monitor loop
//! - A file tail source over the `timestamp,value,` text format
//! - A synthetic trend + seasonality + noise + anomaly generator
//! - A writer that publishes a synthetic stream into a data file

mod synthetic;
mod tail;
mod writer;

#[cfg(test)]
mod tests;

pub use synthetic::{StreamParams, SyntheticSource, SyntheticStream};
pub use tail::FileTailSource;
pub use writer::{StreamWriter, DEFAULT_TOTAL_WRITES};

use crate::error::SourceError;
use crate::models::Reading;

pub use async_trait::async_trait;

/// Trait for producers of readings in strictly increasing timestamp order
#[async_trait]
pub trait ReadingSource: Send {
    /// Return every reading that became available since the previous poll
    async fn poll(&mut self) -> Result<Vec<Reading>, SourceError>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Render a reading as one data file line (`timestamp,value,`)
pub fn format_line(reading: &Reading) -> String {
    format!("{},{},\n", reading.timestamp, reading.value)
}

/// Parse one data file line
///
/// Accepts `timestamp,value` with an optional trailing comma. The timestamp
/// may be written as an integral float (`12.0`).
pub fn parse_line(line: &str) -> Result<Reading, SourceError> {
    let malformed = |reason: &str| SourceError::Malformed {
        line: line.trim().to_string(),
        reason: reason.to_string(),
    };

    let mut fields = line.trim().split(',').map(str::trim);

    let timestamp_field = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| malformed("missing timestamp"))?;
    let value_field = fields
        .next()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| malformed("missing value"))?;

    if fields.any(|f| !f.is_empty()) {
        return Err(malformed("unexpected extra fields"));
    }

    let timestamp = match timestamp_field.parse::<u64>() {
        Ok(ts) => ts,
        Err(_) => {
            let float = timestamp_field
                .parse::<f64>()
                .map_err(|_| malformed("timestamp is not a number"))?;
            if float < 0.0 || float.fract() != 0.0 || !float.is_finite() {
                return Err(malformed("timestamp is not a non-negative integer"));
            }
            float as u64
        }
    };

    let value = value_field
        .parse::<f64>()
        .map_err(|_| malformed("value is not a number"))?;

    Ok(Reading::new(timestamp, value))
}
