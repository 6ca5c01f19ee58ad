//! Health and metrics routes

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use inference_engine::ShapeSource;
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelStatus,
}

/// Model status
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub artifact_path: String,
    pub loaded: bool,
    /// (height, width)
    pub expected_shape: [u32; 2],
    /// "declared" or "default"
    pub shape_source: &'static str,
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model = state.pipeline.model();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let shape = model.expected_shape();
    let shape_source = match model.shape_source() {
        ShapeSource::Declared(_) => "declared",
        ShapeSource::Default { .. } => "default",
    };

    Json(HealthResponse {
        status: if model.is_loaded() { "healthy" } else { "degraded" },
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: ModelStatus {
            artifact_path: model.artifact_path().display().to_string(),
            loaded: model.is_loaded(),
            expected_shape: [shape.height(), shape.width()],
            shape_source,
        },
    })
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}
