//! HTTP error responses

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inference_engine::{ErrorClass, PipelineError};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Malformed upload: {message}")]
    Upload { status: StatusCode, message: String },
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Pipeline(e) => match e.class() {
                ErrorClass::Client => StatusCode::BAD_REQUEST,
                ErrorClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Upload { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Pipeline(e) => {
                match e.class() {
                    ErrorClass::Server => error!("Prediction failed ({}): {}", e.kind().as_str(), e),
                    ErrorClass::Client => warn!("Rejected upload ({}): {}", e.kind().as_str(), e),
                }
                metrics::counter!("prediction_errors_total", "kind" => e.kind().as_str()).increment(1);
                ErrorBody {
                    error: e.public_message().to_string(),
                    kind: e.kind().as_str(),
                }
            }
            ApiError::Upload { message, .. } => {
                warn!("Malformed upload ({}): {}", status, message);
                metrics::counter!("prediction_errors_total", "kind" => "malformed_upload").increment(1);
                ErrorBody {
                    error: "Malformed upload".to_string(),
                    kind: "malformed_upload",
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
