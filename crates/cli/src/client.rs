//! API client for communicating with a running stream detector

use anyhow::{Context, Result};
use detector_lib::{DetectorPhase, DetectorSnapshot};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the detector's HTTP surface
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("healthz").await
    }

    /// Fetch a snapshot with at most `limit` recent points
    pub async fn snapshot(&self, limit: usize) -> Result<DetectorSnapshot> {
        self.get(&format!("snapshot?limit={}", limit)).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub phase: DetectorPhase,
    pub ingested: u64,
    pub anomalies: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_health_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/healthz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok","phase":"steady","ingested":120,"anomalies":3,"last_timestamp":120}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        mock.assert_async().await;
        assert_eq!(health.phase, DetectorPhase::Steady);
        assert_eq!(health.ingested, 120);
        assert_eq!(health.anomalies, 3);
        assert_eq!(health.last_timestamp, Some(120));
    }

    #[tokio::test]
    async fn test_snapshot_sends_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex("^/snapshot".to_string()))
            .match_query(Matcher::UrlEncoded("limit".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "points": [
                        {"timestamp": 4, "value": 100.0, "flagged": true},
                        {"timestamp": 5, "value": 10.0, "flagged": false}
                    ],
                    "mean": 40.0,
                    "variance": 1377.78,
                    "std_dev": 37.12,
                    "tolerance": 1.0,
                    "lower_band": 2.88,
                    "upper_band": 77.12,
                    "window_size": 3,
                    "window_start": 3,
                    "phase": "steady",
                    "ingested": 5,
                    "anomalies": 1,
                    "generated_at": 1700000000
                }"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let snapshot = client.snapshot(2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(snapshot.points.len(), 2);
        assert_eq!(snapshot.flagged_points().count(), 1);
        assert_eq!(snapshot.window_start, Some(3));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.health().await.unwrap_err();

        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
