//! Read-only detector state for visualizers

use serde::{Deserialize, Serialize};

use crate::models::DetectorPhase;

/// One rendered point of the series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPoint {
    pub timestamp: u64,
    pub value: f64,
    pub flagged: bool,
}

/// Point-in-time copy of a detector's series and window statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    /// Most recent points, oldest first
    pub points: Vec<SnapshotPoint>,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub tolerance: f64,
    pub lower_band: f64,
    pub upper_band: f64,
    pub window_size: usize,
    /// Timestamp of the oldest reading inside the local window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<u64>,
    pub phase: DetectorPhase,
    pub ingested: u64,
    pub anomalies: u64,
    pub generated_at: i64,
}

impl DetectorSnapshot {
    /// Points inside the local window
    pub fn window_points(&self) -> impl Iterator<Item = &SnapshotPoint> + '_ {
        let start = self.window_start;
        self.points
            .iter()
            .filter(move |p| start.map(|s| p.timestamp >= s).unwrap_or(false))
    }

    /// Flagged points among those included in the snapshot
    pub fn flagged_points(&self) -> impl Iterator<Item = &SnapshotPoint> + '_ {
        self.points.iter().filter(|p| p.flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(window_start: Option<u64>) -> DetectorSnapshot {
        DetectorSnapshot {
            points: vec![
                SnapshotPoint {
                    timestamp: 1,
                    value: 10.0,
                    flagged: false,
                },
                SnapshotPoint {
                    timestamp: 2,
                    value: 50.0,
                    flagged: true,
                },
            ],
            mean: 10.0,
            variance: 1.0,
            std_dev: 1.0,
            tolerance: 3.0,
            lower_band: 7.0,
            upper_band: 13.0,
            window_size: 2,
            window_start,
            phase: DetectorPhase::Steady,
            ingested: 2,
            anomalies: 1,
            generated_at: 0,
        }
    }

    #[test]
    fn test_window_start_omitted_until_known() {
        let json = serde_json::to_value(snapshot(None)).unwrap();
        assert!(json.get("window_start").is_none());
        assert_eq!(json["phase"], "steady");

        let json = serde_json::to_value(snapshot(Some(2))).unwrap();
        assert_eq!(json["window_start"], 2);
    }

    #[test]
    fn test_point_filters() {
        let snapshot = snapshot(Some(2));

        let window: Vec<u64> = snapshot.window_points().map(|p| p.timestamp).collect();
        let flagged: Vec<u64> = snapshot.flagged_points().map(|p| p.timestamp).collect();

        assert_eq!(window, vec![2]);
        assert_eq!(flagged, vec![2]);
    }
}
