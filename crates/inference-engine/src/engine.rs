//! Model Handle Implementation

use crate::label::Probability;
use crate::shape::{detect_shape, DeclaredDim, ShapeSource};
use crate::InferenceError;
use ndarray::{Array4, Axis};
use preprocess::{PixelTensor, TargetShape, CHANNELS};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::infer::GenericFactoid;
use tract_onnx::tract_hir::internal::DimLike;

/// Pixel tensor with a leading batch axis of one: (1, height, width, 3)
#[derive(Debug, Clone, PartialEq)]
pub struct BatchedTensor {
    data: Array4<f32>,
}

impl BatchedTensor {
    /// Shape as (batch, height, width, channels)
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    /// Values in row-major order
    pub fn values(&self) -> Cow<'_, [f32]> {
        match self.data.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(self.data.iter().copied().collect()),
        }
    }
}

impl From<PixelTensor> for BatchedTensor {
    fn from(tensor: PixelTensor) -> Self {
        Self {
            data: tensor.into_array().insert_axis(Axis(0)),
        }
    }
}

/// Opaque binary classifier: batched tensor in, score for the positive class out.
///
/// Implementations are shared across request threads and must not keep
/// per-call state visible to other callers.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &BatchedTensor) -> Result<f32, InferenceError>;
}

/// ONNX classifier executed by tract
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
}

impl OnnxClassifier {
    /// Load an ONNX model and pin its input to (1, height, width, 3).
    ///
    /// Returns the classifier together with the resolved input shape.
    pub fn load(path: &Path) -> Result<(Self, TargetShape, ShapeSource), InferenceError> {
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| corrupt(path, e))?;

        let (shape, source) = detect_shape(&declared_dims(&model));

        let input_fact = f32::fact([
            1,
            shape.height() as usize,
            shape.width() as usize,
            CHANNELS,
        ]);
        let plan = model
            .with_input_fact(0, input_fact.into())
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| corrupt(path, e))?;

        Ok((Self { plan }, shape, source))
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, input: &BatchedTensor) -> Result<f32, InferenceError> {
        let (batch, height, width, channels) = input.shape();
        let values = input.values();
        let tensor = Tensor::from_shape(&[batch, height, width, channels], &values[..])
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no outputs".into()))?;
        let values = output
            .as_slice::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        values
            .first()
            .copied()
            .ok_or_else(|| InferenceError::InferenceFailed("model output is empty".into()))
    }
}

/// Read the declared dimensions of the first model input
fn declared_dims(model: &InferenceModel) -> Vec<DeclaredDim> {
    let fact = match model.input_fact(0) {
        Ok(fact) => fact,
        Err(e) => {
            debug!("Model declares no input fact: {}", e);
            return Vec::new();
        }
    };

    fact.shape
        .dims()
        .map(|dim| match dim {
            GenericFactoid::Only(d) => d.to_usize().map_or(DeclaredDim::Unknown, DeclaredDim::Fixed),
            GenericFactoid::Any => DeclaredDim::Unknown,
        })
        .collect()
}

fn corrupt(path: &Path, err: impl std::fmt::Display) -> InferenceError {
    InferenceError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Loaded classifier and its fixed input shape.
///
/// Built once at startup and shared read-only between requests.
pub struct ModelHandle {
    /// Model artifact path
    artifact_path: PathBuf,
    /// Resize target, fixed after load
    expected_shape: TargetShape,
    /// How `expected_shape` was obtained
    shape_source: ShapeSource,
    /// `None` when the artifact could not be loaded
    classifier: Option<Box<dyn Classifier>>,
}

impl ModelHandle {
    /// Load the ONNX artifact at `path` and detect its input shape
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading model artifact: {}", path.display());

        if !path.exists() {
            error!("Model artifact not found: {}", path.display());
            return Err(InferenceError::ArtifactNotFound(path.to_path_buf()));
        }

        let (classifier, expected_shape, shape_source) = OnnxClassifier::load(path).map_err(|e| {
            error!("{}", e);
            e
        })?;

        info!(
            "Model loaded: {} (expects {}x{}x{})",
            path.display(),
            expected_shape.height(),
            expected_shape.width(),
            CHANNELS
        );

        Ok(Self {
            artifact_path: path.to_path_buf(),
            expected_shape,
            shape_source,
            classifier: Some(Box::new(classifier)),
        })
    }

    /// Handle for a model that failed to load; `classify` reports `ModelUnavailable`
    pub fn unavailable(path: impl AsRef<Path>) -> Self {
        Self {
            artifact_path: path.as_ref().to_path_buf(),
            expected_shape: TargetShape::DEFAULT,
            shape_source: ShapeSource::Default {
                reason: "model not loaded".to_string(),
            },
            classifier: None,
        }
    }

    /// Wrap an already constructed classifier
    pub fn with_classifier(
        path: impl AsRef<Path>,
        expected_shape: TargetShape,
        classifier: impl Classifier + 'static,
    ) -> Self {
        Self {
            artifact_path: path.as_ref().to_path_buf(),
            expected_shape,
            shape_source: ShapeSource::Default {
                reason: "shape supplied by caller".to_string(),
            },
            classifier: Some(Box::new(classifier)),
        }
    }

    /// Run the classifier and return the score of the positive class
    pub fn classify(&self, input: &BatchedTensor) -> Result<Probability, InferenceError> {
        let classifier = self.classifier.as_ref().ok_or(InferenceError::ModelUnavailable)?;

        let expected = (
            1,
            self.expected_shape.height() as usize,
            self.expected_shape.width() as usize,
            CHANNELS,
        );
        if input.shape() != expected {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", input.shape()),
            });
        }

        let raw = classifier.classify(input)?;
        debug!("Prediction raw value: {}", raw);

        Probability::new(f64::from(raw)).ok_or_else(|| {
            InferenceError::InferenceFailed(format!("model output {} is outside [0, 1]", raw))
        })
    }

    /// Check if a model is loaded
    pub fn is_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn expected_shape(&self) -> TargetShape {
        self.expected_shape
    }

    pub fn shape_source(&self) -> &ShapeSource {
        &self.shape_source
    }

    /// Get model path
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("artifact_path", &self.artifact_path)
            .field("expected_shape", &self.expected_shape)
            .field("shape_source", &self.shape_source)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
