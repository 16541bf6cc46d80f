//! Anomaly sinks
//!
//! A sink durably records each reading classified as anomalous. Records are
//! appended one at a time with no batching and no retry.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::models::Reading;

/// Append-only destination for anomalous readings
pub trait AnomalySink: Send + Sync {
    /// Record one anomalous reading
    fn record(&mut self, reading: &Reading) -> std::io::Result<()>;
}

/// Anomaly log file with one `timestamp,value` line per anomaly
pub struct FileAnomalySink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileAnomalySink {
    /// Create the log, truncating any previous session's content
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        debug!(path = %path.display(), "Anomaly log created");

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AnomalySink for FileAnomalySink {
    fn record(&mut self, reading: &Reading) -> std::io::Result<()> {
        writeln!(self.writer, "{},{}", reading.timestamp, reading.value)?;
        self.writer.flush()
    }
}

/// In-process sink; clones share the same record list
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Reading>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn records(&self) -> Vec<Reading> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl AnomalySink for MemorySink {
    fn record(&mut self, reading: &Reading) -> std::io::Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| std::io::Error::other("memory sink poisoned"))?;
        records.push(*reading);
        Ok(())
    }
}
