//! Prediction Routes

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use inference_engine::{ClassificationResult, Label, PipelineError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;

/// Multipart field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

/// Response for the predict endpoint
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub result: Label,
    pub confidence: f64,
}

impl From<ClassificationResult> for PredictionResponse {
    fn from(result: ClassificationResult) -> Self {
        Self {
            result: result.label,
            confidence: result.confidence,
        }
    }
}

/// Classify an uploaded cell image
pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    info!("New prediction request");

    let multipart = multipart.map_err(|rejection| {
        debug!("Request is not a multipart upload: {}", rejection);
        PipelineError::MissingField(IMAGE_FIELD)
    })?;
    let image = read_image_field(multipart).await?;

    let pipeline = state.pipeline.clone();
    let start = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || pipeline.process(&image))
        .await
        .map_err(|e| PipelineError::Internal(format!("inference task failed: {}", e)))
        .and_then(|result| result);
    metrics::histogram!("inference_latency_seconds").record(start.elapsed().as_secs_f64());

    let result = outcome?;
    metrics::counter!("predictions_total", "label" => result.label.as_str()).increment(1);
    info!(
        "Prediction: {} (confidence={:.4}, latency={:?})",
        result.label,
        result.confidence,
        start.elapsed()
    );

    Ok(Json(PredictionResponse::from(result)))
}

/// Pull the bytes of the `image` field, skipping any other fields
async fn read_image_field(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await?;
            debug!("Received {} bytes in field '{}'", bytes.len(), IMAGE_FIELD);
            return Ok(bytes);
        }
    }

    Err(PipelineError::MissingField(IMAGE_FIELD).into())
}
