//! HTTP API for health checks, Prometheus metrics and detector snapshots

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use detector_lib::{DetectorMetrics, DetectorPhase, Reading, SharedDetector};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub detector: SharedDetector,
    pub metrics: DetectorMetrics,
}

impl AppState {
    pub fn new(detector: SharedDetector, metrics: DetectorMetrics) -> Self {
        Self { detector, metrics }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub phase: DetectorPhase,
    pub ingested: u64,
    pub anomalies: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub phase: DetectorPhase,
    pub readings_until_ready: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotQuery {
    /// Only return the most recent `limit` points
    pub limit: Option<usize>,
}

/// Health check response, always 200 while the process is serving
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let detector = state.detector.read().await;

    let health = HealthResponse {
        status: "ok",
        phase: detector.phase(),
        ingested: detector.ingested(),
        anomalies: detector.anomalies(),
        last_timestamp: detector.last_timestamp(),
    };

    (StatusCode::OK, Json(health))
}

/// Readiness check, 503 until the window has filled and readings are classified
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let detector = state.detector.read().await;
    let window_size = detector.config().window_size as u64;
    let phase = detector.phase();

    let readiness = ReadinessResponse {
        ready: phase == DetectorPhase::Steady,
        phase,
        readings_until_ready: window_size.saturating_sub(detector.ingested()),
    };

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Series, flags and current bands
async fn snapshot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SnapshotQuery>,
) -> impl IntoResponse {
    let detector = state.detector.read().await;
    let snapshot = detector.snapshot(query.limit);

    state
        .metrics
        .set_window(snapshot.mean, snapshot.std_dev);

    Json(snapshot)
}

/// Retained readings flagged anomalous
async fn anomalies(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let detector = state.detector.read().await;
    let flagged: Vec<Reading> = detector.series().anomalies().copied().collect();

    Json(flagged)
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/snapshot", get(snapshot))
        .route("/anomalies", get(anomalies))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
