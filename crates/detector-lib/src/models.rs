//! Core data models for the stream detector

use serde::{Deserialize, Serialize};

/// A single timestamped scalar observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: u64,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: u64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Outcome of ingesting one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyVerdict {
    /// Window still warming up; the point was accumulated but not classified
    NotYetEvaluable,
    Normal,
    Anomalous,
}

impl AnomalyVerdict {
    pub fn is_anomalous(&self) -> bool {
        matches!(self, AnomalyVerdict::Anomalous)
    }

    pub fn is_evaluated(&self) -> bool {
        !matches!(self, AnomalyVerdict::NotYetEvaluable)
    }
}

impl std::fmt::Display for AnomalyVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyVerdict::NotYetEvaluable => write!(f, "not_yet_evaluable"),
            AnomalyVerdict::Normal => write!(f, "normal"),
            AnomalyVerdict::Anomalous => write!(f, "anomalous"),
        }
    }
}

/// Lifecycle phase of a detector
///
/// The transition from `WarmingUp` to `Steady` happens once, when the
/// number of ingested readings first reaches the window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorPhase {
    WarmingUp,
    Steady,
}

impl std::fmt::Display for DetectorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorPhase::WarmingUp => write!(f, "warming_up"),
            DetectorPhase::Steady => write!(f, "steady"),
        }
    }
}
