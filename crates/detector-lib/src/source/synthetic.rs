//! Synthetic data stream
//!
//! Generates an endless series with four components:
//! - a linear baseline trend
//! - a seasonal sine wave whose amplitude follows the baseline
//! - gaussian noise proportional to the baseline
//! - occasional injected anomalies

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::{async_trait, ReadingSource};
use crate::error::SourceError;
use crate::models::Reading;

/// Default number of readings handed out per poll
const DEFAULT_BATCH: usize = 1;

/// Shape of the synthetic stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamParams {
    /// Baseline value at t = 0
    pub base_value: f64,
    /// Baseline increase per time step
    pub trend_slope: f64,
    /// Time steps per seasonal cycle
    pub seasonal_period: f64,
    /// Noise standard deviation as a fraction of the baseline
    pub noise_level: f64,
    /// Injected anomalies move the value by `|1 - anomaly_level|` times the baseline
    pub anomaly_level: f64,
    /// Probability that a point carries an anomaly
    pub anomaly_chance: f64,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            base_value: 10.0,
            trend_slope: 0.01,
            seasonal_period: 50.0,
            noise_level: 0.5,
            anomaly_level: 1.0,
            anomaly_chance: 0.05,
        }
    }
}

impl StreamParams {
    pub fn validate(&self) -> Result<(), SourceError> {
        let all_finite = [
            self.base_value,
            self.trend_slope,
            self.seasonal_period,
            self.noise_level,
            self.anomaly_level,
            self.anomaly_chance,
        ]
        .iter()
        .all(|v| v.is_finite());

        if !all_finite {
            return Err(SourceError::InvalidParameters(
                "all parameters must be finite".to_string(),
            ));
        }

        if self.seasonal_period <= 0.0 {
            return Err(SourceError::InvalidParameters(format!(
                "seasonal period must be positive, got {}",
                self.seasonal_period
            )));
        }

        if self.noise_level < 0.0 {
            return Err(SourceError::InvalidParameters(format!(
                "noise level must not be negative, got {}",
                self.noise_level
            )));
        }

        if !(0.0..=1.0).contains(&self.anomaly_chance) {
            return Err(SourceError::InvalidParameters(format!(
                "anomaly chance must be within [0, 1], got {}",
                self.anomaly_chance
            )));
        }

        Ok(())
    }
}

/// Lazy, endless synthetic stream starting at t = 1
pub struct SyntheticStream {
    params: StreamParams,
    rng: StdRng,
    current_time: u64,
}

impl SyntheticStream {
    /// Create a stream seeded from OS entropy
    pub fn new(params: StreamParams) -> Result<Self, SourceError> {
        params.validate()?;
        Ok(Self {
            params,
            rng: StdRng::from_entropy(),
            current_time: 1,
        })
    }

    /// Create a reproducible stream
    pub fn seeded(params: StreamParams, seed: u64) -> Result<Self, SourceError> {
        params.validate()?;
        Ok(Self {
            params,
            rng: StdRng::seed_from_u64(seed),
            current_time: 1,
        })
    }

    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    /// Timestamp of the next reading
    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    /// Underlying linear trend
    pub fn baseline(&self, t: u64) -> f64 {
        self.params.base_value + t as f64 * self.params.trend_slope
    }

    /// Seasonal component, one full cycle per seasonal period
    ///
    /// The amplitude is 10% of the baseline, never below 1.
    pub fn seasonal(&self, t: u64) -> f64 {
        let amplitude = (0.1 * self.baseline(t)).max(1.0);
        amplitude * (t as f64 * (2.0 * PI / self.params.seasonal_period)).sin()
    }

    fn noise(&mut self, t: u64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        self.params.noise_level * self.baseline(t) * z
    }

    fn anomaly(&mut self, t: u64) -> f64 {
        if self.rng.gen::<f64>() >= self.params.anomaly_chance {
            return 0.0;
        }

        let shift = self.baseline(t) * (1.0 - self.params.anomaly_level).abs();
        if self.rng.gen_bool(0.5) {
            (-shift).min(-1.0)
        } else {
            shift.max(1.0)
        }
    }

    /// Generate the value for time `t`
    pub fn generate(&mut self, t: u64) -> f64 {
        self.baseline(t) + self.seasonal(t) + self.noise(t) + self.anomaly(t)
    }
}

impl Iterator for SyntheticStream {
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        let t = self.current_time;
        let value = self.generate(t);
        self.current_time += 1;
        Some(Reading::new(t, value))
    }
}

/// Source handing out a fixed number of synthetic readings per poll
pub struct SyntheticSource {
    stream: SyntheticStream,
    batch: usize,
}

impl SyntheticSource {
    pub fn new(stream: SyntheticStream) -> Self {
        Self {
            stream,
            batch: DEFAULT_BATCH,
        }
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch.max(1);
        self
    }
}

#[async_trait]
impl ReadingSource for SyntheticSource {
    async fn poll(&mut self) -> Result<Vec<Reading>, SourceError> {
        Ok(self.stream.by_ref().take(self.batch).collect())
    }

    fn describe(&self) -> String {
        format!("synthetic:t={}", self.stream.current_time())
    }
}
