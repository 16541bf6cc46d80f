//! File tail source
//!
//! Follows a data file that another process keeps appending to. The byte
//! offset of the last consumed line is remembered between polls, and only
//! newline-terminated lines are consumed, so a line being written while we
//! read is picked up whole on the next poll.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use super::{async_trait, parse_line, ReadingSource};
use crate::error::SourceError;
use crate::models::Reading;

/// Incremental reader over a growing `timestamp,value,` file
pub struct FileTailSource {
    path: PathBuf,
    offset: u64,
}

impl FileTailSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            offset: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset just past the last consumed line
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the unconsumed tail of the file
    async fn read_tail(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Data file not created yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        if len < self.offset {
            warn!(
                path = %self.path.display(),
                offset = self.offset,
                len = len,
                "Data file shrank, assuming the writer restarted"
            );
            self.offset = 0;
        }

        if len == self.offset {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        file.read_to_end(&mut buf).await?;

        Ok(Some(buf))
    }
}

#[async_trait]
impl ReadingSource for FileTailSource {
    async fn poll(&mut self) -> Result<Vec<Reading>, SourceError> {
        let Some(buf) = self.read_tail().await? else {
            return Ok(Vec::new());
        };

        // Only complete lines are consumed
        let Some(end) = buf.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };

        let mut readings = Vec::new();
        let mut consumed = 0usize;

        for line in buf[..=end].split_inclusive(|b| *b == b'\n') {
            let parsed = std::str::from_utf8(line)
                .map_err(|_| SourceError::Malformed {
                    line: String::from_utf8_lossy(line).trim().to_string(),
                    reason: "not valid UTF-8".to_string(),
                })
                .and_then(|text| {
                    if text.trim().is_empty() {
                        Ok(None)
                    } else {
                        parse_line(text).map(Some)
                    }
                });

            match parsed {
                Ok(Some(reading)) => {
                    readings.push(reading);
                    consumed += line.len();
                }
                Ok(None) => consumed += line.len(),
                Err(e) => {
                    // Hand out the good lines first; the bad line is
                    // reported (and skipped) on the next poll.
                    if readings.is_empty() {
                        consumed += line.len();
                        self.offset += consumed as u64;
                        return Err(e);
                    }
                    break;
                }
            }
        }

        self.offset += consumed as u64;
        Ok(readings)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
