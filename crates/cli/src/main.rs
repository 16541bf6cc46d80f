//! Stream anomaly detector CLI
//!
//! A command-line tool for generating synthetic data streams, replaying
//! data files through a detector and watching a running detector.

mod client;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{generate, scan, status, watch};
use detector_lib::VarianceMode;
use tracing_subscriber::EnvFilter;

/// Stream anomaly detector CLI
#[derive(Parser)]
#[command(name = "streamctl")]
#[command(author, version, about = "CLI for the Stream Anomaly Detector", long_about = None)]
pub struct Cli {
    /// Detector API URL (can also be set via STREAMCTL_API_URL env var)
    #[arg(long, env = "STREAMCTL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a synthetic stream into a data file
    Generate {
        /// Data file to (re)create
        #[arg(long, short, env = "DETECTOR_DATA_FILE", default_value = "data.txt")]
        output: PathBuf,

        /// Milliseconds between writes
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Number of readings to write
        #[arg(long, default_value_t = detector_lib::source::DEFAULT_TOTAL_WRITES)]
        total: u64,

        /// Seed for a reproducible stream
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        shape: StreamShape,
    },

    /// Replay a data file through a fresh detector
    Scan {
        /// Data file with `timestamp,value,` lines
        file: PathBuf,

        #[command(flatten)]
        detector: DetectorArgs,

        /// Also write anomalies to this log (truncated first)
        #[arg(long)]
        anomaly_log: Option<PathBuf>,
    },

    /// Render a running detector's window and recent points
    Watch {
        /// Milliseconds between refreshes
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Number of recent points to show
        #[arg(long, default_value_t = 30)]
        points: usize,

        /// Chart width in characters
        #[arg(long, default_value_t = 60)]
        width: usize,

        /// Render once and exit
        #[arg(long)]
        once: bool,
    },

    /// Show detector health
    Status,
}

/// Synthetic stream shape
#[derive(clap::Args, Debug, Clone)]
pub struct StreamShape {
    /// Starting level of the trend
    #[arg(long, default_value_t = 10.0)]
    pub base_value: f64,

    /// Trend increase per tick
    #[arg(long, default_value_t = 0.01)]
    pub trend_slope: f64,

    /// Seasonal period in ticks
    #[arg(long, default_value_t = 50.0)]
    pub seasonal_period: f64,

    /// Noise standard deviation relative to the trend
    #[arg(long, default_value_t = 0.5)]
    pub noise_level: f64,

    /// Anomaly shift factor relative to the trend
    #[arg(long, default_value_t = 1.0)]
    pub anomaly_level: f64,

    /// Probability of an anomaly on each tick
    #[arg(long, default_value_t = 0.05)]
    pub anomaly_chance: f64,
}

/// Detector settings for offline replay
#[derive(clap::Args, Debug, Clone)]
pub struct DetectorArgs {
    /// Trailing window size
    #[arg(long, short = 'w', env = "DETECTOR_WINDOW_SIZE", default_value_t = 100)]
    pub window_size: usize,

    /// Tolerance in standard deviations
    #[arg(long, short = 'k', env = "DETECTOR_TOLERANCE", default_value_t = 3.0)]
    pub tolerance: f64,

    /// Window variance computation
    #[arg(long, value_enum, default_value = "incremental")]
    pub variance_mode: VarianceArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VarianceArg {
    /// Running approximation
    Incremental,
    /// Exact sample variance of the window
    Exact,
}

impl From<VarianceArg> for VarianceMode {
    fn from(arg: VarianceArg) -> Self {
        match arg {
            VarianceArg::Incremental => VarianceMode::Incremental,
            VarianceArg::Exact => VarianceMode::Exact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    }

    // Execute command
    match cli.command {
        Commands::Generate {
            output,
            interval_ms,
            total,
            seed,
            shape,
        } => {
            generate::generate(&output, interval_ms, total, seed, shape, cli.format).await?;
        }
        Commands::Scan {
            file,
            detector,
            anomaly_log,
        } => {
            scan::scan_file(&file, &detector, anomaly_log.as_deref(), cli.format).await?;
        }
        Commands::Watch {
            interval_ms,
            points,
            width,
            once,
        } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            watch::watch(&client, interval_ms, points, width, once, cli.format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&cli.api_url)?;
            status::show_status(&client, cli.format).await?;
        }
    }

    Ok(())
}
