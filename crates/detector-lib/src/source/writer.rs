//! Real-time data file writer
//!
//! Publishes readings into a data file at a fixed cadence so that a detector
//! process can tail it. The file is truncated before the first write.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info};

use super::format_line;
use crate::models::Reading;

/// Default number of readings written per session
pub const DEFAULT_TOTAL_WRITES: u64 = 10_000;

/// Default write period
const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Writes one reading per tick into a data file
#[derive(Debug, Clone)]
pub struct StreamWriter {
    path: PathBuf,
    interval: Duration,
    total_writes: u64,
}

impl StreamWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            interval: DEFAULT_INTERVAL,
            total_writes: DEFAULT_TOTAL_WRITES,
        }
    }

    /// Set the write period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set how many readings to write before stopping
    pub fn with_total_writes(mut self, total_writes: u64) -> Self {
        self.total_writes = total_writes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write readings until `total_writes` is reached, the stream ends or a
    /// shutdown signal arrives. Returns the number of readings written.
    pub async fn run<I>(&self, stream: I, mut shutdown: broadcast::Receiver<()>) -> Result<u64>
    where
        I: IntoIterator<Item = Reading>,
    {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let mut file = tokio::fs::File::create(&self.path)
            .await
            .with_context(|| format!("Failed to create data file {:?}", self.path))?;

        info!(
            path = %self.path.display(),
            interval_ms = self.interval.as_millis(),
            total_writes = self.total_writes,
            "Starting stream writer"
        );

        let mut stream = stream.into_iter();
        let mut ticker = interval(self.interval);
        let mut written = 0u64;

        while written < self.total_writes {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(reading) = stream.next() else {
                        break;
                    };

                    file.write_all(format_line(&reading).as_bytes())
                        .await
                        .context("Failed to append reading")?;
                    file.flush().await.context("Failed to flush data file")?;

                    written += 1;
                    debug!(timestamp = reading.timestamp, value = reading.value, "Reading written");
                }
                _ = shutdown.recv() => {
                    info!("Shutting down stream writer");
                    break;
                }
            }
        }

        info!(written = written, "Stream writer finished");
        Ok(written)
    }
}
