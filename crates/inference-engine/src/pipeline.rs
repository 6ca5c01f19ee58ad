//! Image-to-label request pipeline

use std::sync::Arc;
use std::time::Instant;

use preprocess::{decode, normalize, resize};
use tracing::debug;

use crate::engine::{BatchedTensor, ModelHandle};
use crate::label::{ClassificationResult, LabelPolicy};
use crate::PipelineError;

/// Decode, resize, normalize, classify and interpret one uploaded image
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    model: Arc<ModelHandle>,
    labels: LabelPolicy,
}

impl InferencePipeline {
    pub fn new(model: Arc<ModelHandle>, labels: LabelPolicy) -> Self {
        Self { model, labels }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Run every stage in order. The first failing stage ends the request
    /// and its error is returned unchanged.
    pub fn process(&self, raw: &[u8]) -> Result<ClassificationResult, PipelineError> {
        let start = Instant::now();

        let image = decode(raw)?;
        let resized = resize(&image, self.model.expected_shape());
        let tensor = normalize(&resized);
        let batched = BatchedTensor::from(tensor);

        let probability = self.model.classify(&batched)?;
        let result = self.labels.interpret(probability);

        debug!(
            "Classified {} bytes as {} (p={:.4}, confidence={:.4}) in {:?}",
            raw.len(),
            result.label,
            probability.value(),
            result.confidence,
            start.elapsed()
        );

        Ok(result)
    }
}
