//! Trailing window statistics
//!
//! Maintains the running mean and sample variance of the most recent `W`
//! readings in O(1) per update. The default update reproduces the classic
//! streaming approximation, in which both the departing and arriving terms
//! of the variance are measured against the freshly updated mean. An exact
//! sliding Welford update is available as an opt-in.

use serde::{Deserialize, Serialize};

/// How the window variance is maintained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceMode {
    /// Post-update-mean accumulation. The mean is accumulated as `v / W`
    /// during warm-up and the variance may drift from the true window
    /// variance (it can even dip below zero).
    #[default]
    Incremental,
    /// Sliding Welford update; the variance is the exact sample variance of
    /// the readings currently in the window.
    Exact,
}

/// Sufficient statistics for the trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    size: usize,
    mode: VarianceMode,
    mean: f64,
    variance: f64,
    std_dev: f64,
    /// Sum of squared deviations, only used in exact mode
    m2: f64,
    /// Readings admitted during warm-up, only used in exact mode
    admitted: usize,
}

impl WindowState {
    /// Create empty statistics for a window of `size` readings
    pub fn new(size: usize, mode: VarianceMode) -> Self {
        Self {
            size,
            mode,
            mean: 0.0,
            variance: 0.0,
            std_dev: 0.0,
            m2: 0.0,
            admitted: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn mode(&self) -> VarianceMode {
        self.mode
    }

    /// Current running mean
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Current running variance (sample variance, divisor `W - 1`)
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Current standard deviation
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Lower and upper threshold bands for a tolerance multiplier
    pub fn bands(&self, tolerance: f64) -> (f64, f64) {
        let band = tolerance * self.std_dev;
        (self.mean - band, self.mean + band)
    }

    /// Add a reading while the window is still filling up
    pub(crate) fn admit(&mut self, value: f64) {
        let w = self.size as f64;

        match self.mode {
            VarianceMode::Incremental => {
                self.mean += value / w;
                self.variance += (value - self.mean).powi(2) / (w - 1.0);
            }
            VarianceMode::Exact => {
                self.admitted += 1;
                let delta = value - self.mean;
                self.mean += delta / self.admitted as f64;
                self.m2 += delta * (value - self.mean);
                self.variance = if self.admitted > 1 {
                    self.m2 / (self.admitted - 1) as f64
                } else {
                    0.0
                };
            }
        }

        self.refresh_std_dev();
    }

    /// Replace the oldest reading in a full window with a new one
    pub(crate) fn slide(&mut self, outgoing: f64, incoming: f64) {
        let w = self.size as f64;

        match self.mode {
            VarianceMode::Incremental => {
                self.mean = self.mean - outgoing / w + incoming / w;
                self.variance = self.variance - (outgoing - self.mean).powi(2) / (w - 1.0)
                    + (incoming - self.mean).powi(2) / (w - 1.0);
            }
            VarianceMode::Exact => {
                let previous_mean = self.mean;
                self.mean += (incoming - outgoing) / w;
                self.m2 += (incoming - outgoing) * (incoming - self.mean + outgoing - previous_mean);
                // Rounding can leave a tiny negative residue for constant windows
                self.m2 = self.m2.max(0.0);
                self.variance = self.m2 / (w - 1.0);
            }
        }

        self.refresh_std_dev();
    }

    /// Point anomaly test against the current statistics
    ///
    /// A value is anomalous when it lies on or beyond `mean ± tolerance * std_dev`.
    /// With a zero standard deviation any value other than the mean is anomalous.
    pub fn is_outlier(&self, value: f64, tolerance: f64) -> bool {
        if self.std_dev == 0.0 {
            return value != self.mean;
        }

        let (lower, upper) = self.bands(tolerance);
        value <= lower || value >= upper
    }

    fn refresh_std_dev(&mut self) {
        self.std_dev = self.variance.max(0.0).sqrt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_variance(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
    }

    #[test]
    fn test_incremental_warm_up_accumulates() {
        let mut window = WindowState::new(3, VarianceMode::Incremental);

        window.admit(10.0);
        assert!((window.mean() - 10.0 / 3.0).abs() < 1e-12);
        // (10 - 10/3)^2 / 2
        assert!((window.variance() - 200.0 / 9.0).abs() < 1e-9);

        window.admit(10.0);
        window.admit(10.0);
        assert!((window.mean() - 10.0).abs() < 1e-12);
        assert!((window.variance() - 250.0 / 9.0).abs() < 1e-9);
        assert!((window.std_dev() - (250.0f64 / 9.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_incremental_slide_uses_updated_mean() {
        let mut window = WindowState::new(3, VarianceMode::Incremental);
        for _ in 0..3 {
            window.admit(10.0);
        }

        window.slide(10.0, 100.0);
        assert!((window.mean() - 40.0).abs() < 1e-9);
        // 250/9 - 900/2 + 3600/2
        assert!((window.variance() - (250.0 / 9.0 + 1350.0)).abs() < 1e-6);
    }

    #[test]
    fn test_incremental_variance_can_go_negative_without_nan() {
        let mut window = WindowState::new(2, VarianceMode::Incremental);
        window.admit(0.0);
        window.admit(0.0);
        window.slide(0.0, 1.0);
        window.slide(0.0, 1.0);

        // 0 - (0 - 1)^2 + (1 - 1)^2
        assert!((window.variance() + 1.0).abs() < 1e-12);
        assert_eq!(window.std_dev(), 0.0);
    }

    #[test]
    fn test_exact_mode_matches_two_pass_variance() {
        let values = [4.0, 7.0, 13.0, 16.0, 2.5, 9.0, 11.0, 30.0, -4.0, 6.0];
        let size = 4;
        let mut window = WindowState::new(size, VarianceMode::Exact);

        for (i, value) in values.iter().enumerate() {
            if i < size {
                window.admit(*value);
            } else {
                window.slide(values[i - size], *value);
            }

            if i + 1 >= size {
                let current = &values[i + 1 - size..=i];
                let mean = current.iter().sum::<f64>() / size as f64;
                assert!((window.mean() - mean).abs() < 1e-9);
                assert!((window.variance() - sample_variance(current)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_outlier_bands_are_inclusive() {
        let mut window = WindowState::new(2, VarianceMode::Exact);
        window.admit(1.0);
        window.admit(3.0);
        // mean 2, variance 2, std_dev sqrt(2)
        let (lower, upper) = window.bands(1.0);

        assert!(window.is_outlier(upper, 1.0));
        assert!(window.is_outlier(lower, 1.0));
        assert!(!window.is_outlier(2.5, 1.0));
    }

    #[test]
    fn test_zero_std_dev_flags_any_departure() {
        let mut window = WindowState::new(3, VarianceMode::Exact);
        for _ in 0..3 {
            window.admit(5.0);
        }

        assert_eq!(window.std_dev(), 0.0);
        assert!(!window.is_outlier(5.0, 2.0));
        assert!(window.is_outlier(5.0001, 2.0));
        assert!(window.is_outlier(4.9999, 2.0));
    }
}
