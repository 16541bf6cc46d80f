//! Terminal visualizer for a running detector

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use detector_lib::{DetectorSnapshot, SnapshotPoint};

use crate::client::ApiClient;
use crate::output::{color_phase, format_unix_time, format_value, print_error, OutputFormat};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// Linear mapping from values to chart columns
struct Scale {
    low: f64,
    high: f64,
    width: usize,
}

impl Scale {
    /// Fit the bands and every point into `width` columns
    fn fit(snapshot: &DetectorSnapshot, width: usize) -> Self {
        let (mut low, mut high) = (snapshot.lower_band, snapshot.upper_band);
        for point in &snapshot.points {
            low = low.min(point.value);
            high = high.max(point.value);
        }

        Self {
            low,
            high,
            width: width.max(3),
        }
    }

    fn column(&self, value: f64) -> usize {
        let span = self.high - self.low;
        if !span.is_finite() || span <= 0.0 || !value.is_finite() {
            return self.width / 2;
        }

        let position = (value - self.low) / span * (self.width - 1) as f64;
        (position.round().max(0.0) as usize).min(self.width - 1)
    }
}

/// Render one point as a row of the chart
///
/// `|` marks the bands, `:` the mean, `*` a normal point and `X` a flagged one.
fn render_row(point: &SnapshotPoint, snapshot: &DetectorSnapshot, scale: &Scale) -> String {
    let mut row = vec![' '; scale.width];

    row[scale.column(snapshot.lower_band)] = '|';
    row[scale.column(snapshot.upper_band)] = '|';
    row[scale.column(snapshot.mean)] = ':';
    row[scale.column(point.value)] = if point.flagged { 'X' } else { '*' };

    row.into_iter().collect()
}

/// Render the chart rows, oldest point first
fn render_chart(snapshot: &DetectorSnapshot, width: usize) -> Vec<(String, bool)> {
    let scale = Scale::fit(snapshot, width);

    snapshot
        .points
        .iter()
        .map(|point| {
            let line = format!(
                "{:>8} {:>12} {}",
                point.timestamp,
                format_value(point.value),
                render_row(point, snapshot, &scale)
            );
            (line, point.flagged)
        })
        .collect()
}

fn print_snapshot(snapshot: &DetectorSnapshot, width: usize) {
    println!("{}", "Stream Detector".bold());
    println!("{}", "=".repeat(width + 22));
    println!(
        "Phase: {}  Ingested: {}  Anomalies: {}",
        color_phase(snapshot.phase),
        snapshot.ingested,
        snapshot.anomalies.to_string().red()
    );
    println!(
        "Window: {}  Mean: {}  Std dev: {}  Tolerance: {}σ",
        snapshot.window_size,
        format_value(snapshot.mean),
        format_value(snapshot.std_dev),
        snapshot.tolerance
    );
    println!(
        "Bands: [{}, {}]{}",
        format_value(snapshot.lower_band),
        format_value(snapshot.upper_band),
        snapshot
            .window_start
            .map(|ts| format!("  Window starts at t={}", ts))
            .unwrap_or_default()
    );
    println!();

    for (line, flagged) in render_chart(snapshot, width) {
        if flagged {
            println!("{}", line.red().bold());
        } else {
            println!("{}", line);
        }
    }

    println!();
    println!("{}", format_unix_time(snapshot.generated_at).dimmed());
}

/// Poll `/snapshot` and redraw until interrupted
pub async fn watch(
    client: &ApiClient,
    interval_ms: u64,
    points: usize,
    width: usize,
    once: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        let snapshot = match client.snapshot(points).await {
            Ok(snapshot) => snapshot,
            Err(e) if !once => {
                print_error(&format!("Failed to fetch snapshot: {:#}", e));
                continue;
            }
            Err(e) => return Err(e),
        };

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(&snapshot)?);
            }
            OutputFormat::Table => {
                if !once {
                    print!("{}", CLEAR_SCREEN);
                }
                print_snapshot(&snapshot, width);
            }
        }

        if once {
            return Ok(());
        }
    }
}
