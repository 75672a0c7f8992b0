use std::sync::Arc;

use candle_core::Tensor;

use crate::error::EegError;
use crate::model::bundle::ModelBundle;
use crate::types::Segment;

/// Forward-pass boundary of the pipeline. The production implementation
/// wraps the resolved candle network; tests inject deterministic mocks.
/// Stateless given its bundle and free of side effects.
pub trait ClassifierBackend: Send + Sync {
    /// Returns one raw score vector per segment, in segment order.
    fn classify(&self, segments: &[Segment]) -> Result<Vec<Vec<f32>>, EegError>;

    fn backend_label(&self) -> String;
}

/// Batched invocation of a resolved [`ModelBundle`].
pub struct CandleClassifierBackend {
    bundle: Arc<ModelBundle>,
    batch_size: usize,
}

impl CandleClassifierBackend {
    pub fn new(bundle: Arc<ModelBundle>, batch_size: usize) -> Self {
        Self {
            bundle,
            batch_size: batch_size.max(1),
        }
    }

    fn classify_batch(&self, batch: &[Segment]) -> Result<Vec<Vec<f32>>, EegError> {
        let channels = batch[0].data.len();
        let window = batch[0].data.first().map_or(0, Vec::len);

        let mut flat = Vec::with_capacity(batch.len() * channels * window);
        for segment in batch {
            for channel in &segment.data {
                if channel.len() != window {
                    return Err(EegError::invalid_input(
                        "segments passed to the classifier must share one window length",
                    ));
                }
                flat.extend_from_slice(channel);
            }
        }

        let input = Tensor::from_vec(
            flat,
            (batch.len(), 1, channels, window),
            &self.bundle.device,
        )
        .map_err(|e| EegError::runtime("input tensor creation", e))?;
        let scores = self
            .bundle
            .model
            .forward(&input)
            .map_err(|e| EegError::runtime("forward pass", e))?;
        scores
            .to_vec2()
            .map_err(|e| EegError::runtime("score readback", e))
    }
}

impl ClassifierBackend for CandleClassifierBackend {
    fn classify(&self, segments: &[Segment]) -> Result<Vec<Vec<f32>>, EegError> {
        let mut scores = Vec::with_capacity(segments.len());
        for batch in segments.chunks(self.batch_size) {
            scores.extend(self.classify_batch(batch)?);
        }
        Ok(scores)
    }

    fn backend_label(&self) -> String {
        if self.bundle.device.is_cuda() {
            "cuda".to_string()
        } else {
            "cpu".to_string()
        }
    }
}
