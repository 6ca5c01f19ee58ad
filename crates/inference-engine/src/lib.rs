//! Cell Classification Inference Engine
//!
//! Loads the ONNX classifier with tract, detects its input shape and turns
//! uploaded image bytes into a labeled, confidence-scored result.

mod engine;
mod label;
mod pipeline;
mod shape;

pub use engine::{BatchedTensor, Classifier, ModelHandle, OnnxClassifier};
pub use label::{interpret, ClassificationResult, Label, LabelPolicy, Probability, DECISION_THRESHOLD};
pub use pipeline::InferencePipeline;
pub use preprocess::{PixelTensor, PreprocessError, TargetShape};
pub use shape::{detect_shape, DeclaredDim, InputLayout, LayoutError, ShapeSource};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the model handle
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),
    #[error("Model artifact {} could not be loaded: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },
    #[error("Model not loaded")]
    ModelUnavailable,
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

/// Any failure of the request pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("Missing form field: {0}")]
    MissingField(&'static str),
    #[error("Internal fault: {0}")]
    Internal(String),
}

/// Flat error taxonomy used for logs, metrics and status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ArtifactNotFound,
    ArtifactCorrupt,
    ModelUnavailable,
    EmptyInput,
    MissingField,
    UnsupportedImageFormat,
    ImageTooLarge,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ArtifactNotFound => "artifact_not_found",
            ErrorKind::ArtifactCorrupt => "artifact_corrupt",
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::EmptyInput => "empty_input",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::UnsupportedImageFormat => "unsupported_image_format",
            ErrorKind::ImageTooLarge => "image_too_large",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Who caused a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad or missing input (4xx)
    Client,
    /// Deployment problem or unexpected fault (5xx)
    Server,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Preprocess(PreprocessError::EmptyInput) => ErrorKind::EmptyInput,
            PipelineError::Preprocess(PreprocessError::UnsupportedImageFormat(_)) => {
                ErrorKind::UnsupportedImageFormat
            }
            PipelineError::Preprocess(PreprocessError::ImageTooLarge(_)) => ErrorKind::ImageTooLarge,
            PipelineError::Preprocess(PreprocessError::Decode(_)) => ErrorKind::Internal,
            PipelineError::Inference(InferenceError::ArtifactNotFound(_)) => ErrorKind::ArtifactNotFound,
            PipelineError::Inference(InferenceError::ArtifactCorrupt { .. }) => ErrorKind::ArtifactCorrupt,
            PipelineError::Inference(InferenceError::ModelUnavailable) => ErrorKind::ModelUnavailable,
            PipelineError::Inference(_) => ErrorKind::Internal,
            PipelineError::MissingField(_) => ErrorKind::MissingField,
            PipelineError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.kind() {
            ErrorKind::EmptyInput
            | ErrorKind::MissingField
            | ErrorKind::UnsupportedImageFormat
            | ErrorKind::ImageTooLarge => ErrorClass::Client,
            ErrorKind::ArtifactNotFound
            | ErrorKind::ArtifactCorrupt
            | ErrorKind::ModelUnavailable
            | ErrorKind::Internal => ErrorClass::Server,
        }
    }

    /// Message safe to return to untrusted clients.
    ///
    /// Unexpected faults collapse to one generic text; the full error is only logged.
    pub fn public_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::EmptyInput => "Uploaded image is empty",
            ErrorKind::MissingField => "No image uploaded",
            ErrorKind::UnsupportedImageFormat => "Unsupported or corrupt image format",
            ErrorKind::ImageTooLarge => "Image dimensions too large",
            ErrorKind::ModelUnavailable => "Model not loaded on server",
            ErrorKind::ArtifactNotFound | ErrorKind::ArtifactCorrupt | ErrorKind::Internal => {
                "Internal inference error"
            }
        }
    }
}
