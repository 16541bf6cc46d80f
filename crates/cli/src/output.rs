//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use detector_lib::DetectorPhase;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a reading value or statistic
pub fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{:.3}", value)
    } else {
        value.to_string()
    }
}

/// Format a unix timestamp in seconds
pub fn format_unix_time(secs: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Color the detector phase
pub fn color_phase(phase: DetectorPhase) -> String {
    match phase {
        DetectorPhase::WarmingUp => phase.to_string().yellow().to_string(),
        DetectorPhase::Steady => phase.to_string().green().to_string(),
    }
}

/// Color a health status string
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ok" | "healthy" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        _ => status.red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(40.0), "40.000");
        assert_eq!(format_value(-2.34567), "-2.346");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn test_format_unix_time() {
        assert_eq!(format_unix_time(0), "1970-01-01 00:00:00 UTC");
    }
}
