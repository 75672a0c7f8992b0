//! Architecture hyperparameter inference from weight tensor shapes.
//!
//! Published checkpoints do not always ship a configuration document, but
//! the EEGNet layer shapes pin down every hyperparameter except the pool
//! factors. This stays a pure function over the tensor map so it is
//! testable without touching any artifact store or device.

use std::collections::HashMap;

use candle_core::Tensor;

use crate::config::ArtifactConfigDoc;

/// Checkpoint key prefixes stripped before any shape inspection. Covers
/// DataParallel wrappers and containers nested under a conventional key.
const STRIP_PREFIXES: &[&str] = &["module.", "model.", "state_dict."];

pub(crate) const FIRSTCONV_WEIGHT: &str = "firstconv.0.weight";
pub(crate) const DEPTHWISE_WEIGHT: &str = "depthwise.0.weight";
pub(crate) const SEPARABLE_DEPTH_WEIGHT: &str = "separable.0.weight";
pub(crate) const SEPARABLE_POINT_WEIGHT: &str = "separable.1.weight";
pub(crate) const CLASSIFIER_WEIGHT: &str = "classifier.weight";
pub(crate) const CLASSIFIER_BIAS: &str = "classifier.bias";

/// Resolved EEGNet architecture hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hparams {
    /// First-stage temporal filter count.
    pub f1: usize,
    /// Depth multiplier of the spatial (depthwise) stage.
    pub d: usize,
    /// Final feature width feeding the classifier.
    pub f2: usize,
    /// First-stage temporal kernel length.
    pub k1: usize,
    /// Separable-stage temporal kernel length.
    pub k2: usize,
    pub pool1: usize,
    pub pool2: usize,
}

impl Default for Hparams {
    fn default() -> Self {
        Self {
            f1: 32,
            d: 2,
            f2: 64,
            k1: 250,
            k2: 32,
            pool1: 4,
            pool2: 8,
        }
    }
}

impl Hparams {
    /// Applies explicit configuration-document values over inferred ones.
    pub fn with_doc_overrides(mut self, doc: &ArtifactConfigDoc) -> Self {
        if let Some(k1) = doc.kernel_length {
            self.k1 = k1;
        }
        if let Some(k2) = doc.sep_length {
            self.k2 = k2;
        }
        if let Some(f1) = doc.f1 {
            self.f1 = f1;
        }
        if let Some(d) = doc.d {
            self.d = d;
        }
        if let Some(p1) = doc.pool1 {
            self.pool1 = p1;
        }
        if let Some(p2) = doc.pool2 {
            self.pool2 = p2;
        }
        self
    }
}

/// Strips known wrapper prefixes from every tensor name.
pub(crate) fn strip_prefixes(tensors: HashMap<String, Tensor>) -> HashMap<String, Tensor> {
    tensors
        .into_iter()
        .map(|(mut name, tensor)| {
            for prefix in STRIP_PREFIXES {
                if let Some(stripped) = name.strip_prefix(prefix) {
                    name = stripped.to_string();
                }
            }
            (name, tensor)
        })
        .collect()
}

/// A checkpoint is considered compatible when it carries the expected
/// first-stage convolution key.
pub(crate) fn looks_compatible(tensors: &HashMap<String, Tensor>) -> bool {
    tensors.contains_key(FIRSTCONV_WEIGHT)
}

/// Infers hyperparameters from weight shapes, falling back to the
/// training defaults per field. Pool factors are not recoverable from
/// shapes and always come from defaults or the configuration document.
pub fn infer_hparams(tensors: &HashMap<String, Tensor>) -> Hparams {
    let mut hp = Hparams::default();

    if let Some(dims) = tensor_dims(tensors, FIRSTCONV_WEIGHT) {
        // [F1, 1, 1, k1]
        if let (Some(&f1), Some(&k1)) = (dims.first(), dims.last()) {
            hp.f1 = f1;
            hp.k1 = k1;
        }
    }
    if let Some(dims) = tensor_dims(tensors, DEPTHWISE_WEIGHT) {
        // [F1*D, 1, channels, 1]
        if let Some(&out) = dims.first() {
            if hp.f1 > 0 && out >= hp.f1 {
                hp.d = out / hp.f1;
            }
        }
    }
    if let Some(dims) = tensor_dims(tensors, SEPARABLE_DEPTH_WEIGHT) {
        // [F1*D, 1, 1, k2]
        if let Some(&k2) = dims.last() {
            hp.k2 = k2;
        }
    }
    if let Some(dims) = tensor_dims(tensors, SEPARABLE_POINT_WEIGHT) {
        // [F2, F1*D, 1, 1]
        if let Some(&f2) = dims.first() {
            hp.f2 = f2;
        }
    }
    if let Some(dims) = tensor_dims(tensors, CLASSIFIER_WEIGHT) {
        // [n_classes, F2]; the classifier input is authoritative for F2.
        if let Some(&f2) = dims.get(1) {
            hp.f2 = f2;
        }
    }

    hp
}

/// Output dimensionality of the classifier head: weight shape first, bias
/// shape second, configuration document last.
pub fn checkpoint_output_dim(
    tensors: &HashMap<String, Tensor>,
    doc: Option<&ArtifactConfigDoc>,
) -> Option<usize> {
    if let Some(dims) = tensor_dims(tensors, CLASSIFIER_WEIGHT) {
        return dims.first().copied();
    }
    if let Some(dims) = tensor_dims(tensors, CLASSIFIER_BIAS) {
        return dims.first().copied();
    }
    doc.and_then(|d| d.num_classes)
}

fn tensor_dims(tensors: &HashMap<String, Tensor>, key: &str) -> Option<Vec<usize>> {
    tensors.get(key).map(|t| t.dims().to_vec())
}
