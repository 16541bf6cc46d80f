//! Detector health command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_phase, color_status, OutputFormat};

/// Show detector health
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&health)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", "Detector Status".bold());
            println!("{}", "=".repeat(40));
            println!("Status:          {}", color_status(&health.status));
            println!("Phase:           {}", color_phase(health.phase));
            println!("Ingested:        {}", health.ingested);
            println!("Anomalies:       {}", health.anomalies.to_string().red());
            match health.last_timestamp {
                Some(ts) => println!("Last Timestamp:  {}", ts),
                None => println!("Last Timestamp:  {}", "none yet".dimmed()),
            }
        }
    }

    Ok(())
}
