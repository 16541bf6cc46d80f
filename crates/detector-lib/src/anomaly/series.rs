//! Ingested history with index-aligned anomaly flags

use std::collections::VecDeque;

use crate::models::Reading;

/// Append-only history of readings and their anomaly flags
///
/// `readings` and `flagged` always have the same length. A flag can only be
/// raised, never cleared. With a retention limit the oldest entries are
/// evicted in pairs; `evicted()` tells how many, so absolute ingest indices
/// stay recoverable.
#[derive(Debug, Clone, Default)]
pub struct Series {
    readings: VecDeque<Reading>,
    flagged: VecDeque<bool>,
    retention: Option<usize>,
    evicted: u64,
}

impl Series {
    /// Create a series that keeps every reading
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a series that keeps at most `limit` readings
    pub fn with_retention(limit: usize) -> Self {
        Self {
            retention: Some(limit),
            ..Self::default()
        }
    }

    /// Append a reading with its flag cleared
    pub(crate) fn push(&mut self, reading: Reading) {
        if let Some(limit) = self.retention {
            while self.readings.len() >= limit && !self.readings.is_empty() {
                self.readings.pop_front();
                self.flagged.pop_front();
                self.evicted += 1;
            }
        }

        self.readings.push_back(reading);
        self.flagged.push_back(false);
    }

    /// Raise the flag of the most recently appended reading
    pub(crate) fn flag_last(&mut self) {
        if let Some(flag) = self.flagged.back_mut() {
            *flag = true;
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Number of entries dropped by the retention limit
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn retention(&self) -> Option<usize> {
        self.retention
    }

    pub fn get(&self, index: usize) -> Option<(Reading, bool)> {
        Some((*self.readings.get(index)?, *self.flagged.get(index)?))
    }

    pub fn last(&self) -> Option<(Reading, bool)> {
        Some((*self.readings.back()?, *self.flagged.back()?))
    }

    pub fn readings(&self) -> impl Iterator<Item = &Reading> + '_ {
        self.readings.iter()
    }

    pub fn flagged(&self) -> impl Iterator<Item = bool> + '_ {
        self.flagged.iter().copied()
    }

    /// Iterate readings together with their flags
    pub fn iter(&self) -> impl Iterator<Item = (Reading, bool)> + '_ {
        self.readings.iter().copied().zip(self.flagged.iter().copied())
    }

    /// Readings whose flag is raised
    pub fn anomalies(&self) -> impl Iterator<Item = &Reading> + '_ {
        self.readings
            .iter()
            .zip(self.flagged.iter())
            .filter_map(|(reading, flagged)| flagged.then_some(reading))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_flags_aligned() {
        let mut series = Series::new();
        series.push(Reading::new(1, 1.0));
        series.push(Reading::new(2, 5.0));
        series.flag_last();
        series.push(Reading::new(3, 1.5));

        assert_eq!(series.len(), 3);
        assert_eq!(series.flagged().collect::<Vec<_>>(), vec![false, true, false]);
        assert_eq!(series.get(1), Some((Reading::new(2, 5.0), true)));
        assert_eq!(series.anomalies().count(), 1);
    }

    #[test]
    fn test_retention_evicts_in_pairs() {
        let mut series = Series::with_retention(2);
        series.push(Reading::new(1, 1.0));
        series.flag_last();
        series.push(Reading::new(2, 2.0));
        series.push(Reading::new(3, 3.0));

        assert_eq!(series.len(), 2);
        assert_eq!(series.evicted(), 1);
        assert_eq!(series.flagged().collect::<Vec<_>>(), vec![false, false]);
        assert_eq!(series.readings().next().map(|r| r.timestamp), Some(2));
    }

    #[test]
    fn test_flag_last_on_empty_series_is_noop() {
        let mut series = Series::new();
        series.flag_last();
        assert!(series.is_empty());
        assert_eq!(series.last(), None);
    }
}
