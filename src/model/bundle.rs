//! Bundle resolution: repository id -> weights -> validated, ready-to-run
//! classifier. Taxonomy validation happens on raw tensor shapes, before
//! any model construction, so a mispublished checkpoint can never produce
//! scores.

use candle_core::{DType, Device};
use candle_nn::VarBuilder;

use crate::config::{ArtifactConfigDoc, EegConfig};
use crate::error::EegError;
use crate::model::artifacts::{build_repo_id, ArtifactStore};
use crate::model::eegnet::EegNet;
use crate::model::hparams::{
    checkpoint_output_dim, infer_hparams, looks_compatible, strip_prefixes, Hparams,
};
use crate::taxonomy::ClassTaxonomy;

/// Full identity of a resolved bundle. Bundles are cached by this key for
/// the process lifetime; everything influencing the loaded network is in
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleKey {
    pub device_id: String,
    pub taxonomy: ClassTaxonomy,
    pub version: String,
    pub variant: Option<String>,
    pub channel_order: Vec<String>,
}

impl BundleKey {
    pub(crate) fn for_config(config: &EegConfig, channel_order: &[String]) -> Self {
        Self {
            device_id: config.device_id.trim().to_ascii_lowercase(),
            taxonomy: config.taxonomy,
            version: config.version.clone(),
            variant: config.variant.clone(),
            channel_order: channel_order.to_vec(),
        }
    }
}

/// Resolved classifier plus everything needed to invoke and calibrate it.
/// Never mutated after construction; shared across invocations via `Arc`.
pub struct ModelBundle {
    pub taxonomy: ClassTaxonomy,
    pub hparams: Hparams,
    pub repo_id: String,
    pub config_doc: Option<ArtifactConfigDoc>,
    pub(crate) model: EegNet,
    pub(crate) device: Device,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("taxonomy", &self.taxonomy)
            .field("hparams", &self.hparams)
            .field("repo_id", &self.repo_id)
            .finish_non_exhaustive()
    }
}

pub(crate) fn resolve_bundle(
    store: &dyn ArtifactStore,
    config: &EegConfig,
    channel_count: usize,
) -> Result<ModelBundle, EegError> {
    let repo_id = build_repo_id(
        &config.repo_namespace,
        channel_count,
        config.device_id.trim().to_ascii_lowercase().as_str(),
        &config.version,
        config.variant.as_deref(),
    );
    let artifact = store.fetch(&repo_id)?;

    let device = match config.compute_device.as_str() {
        "cuda" => Device::new_cuda(0).map_err(|e| EegError::runtime("CUDA init", e))?,
        _ => Device::Cpu,
    };

    let tensors = candle_core::safetensors::load(&artifact.weights_path, &device)
        .map_err(|e| EegError::artifact(repo_id.as_str(), format!("load weights: {e}")))?;
    let tensors = strip_prefixes(tensors);
    if !looks_compatible(&tensors) {
        return Err(EegError::artifact(
            repo_id.as_str(),
            "unsupported checkpoint format: no firstconv.0.weight key",
        ));
    }

    let requested = config.taxonomy.len();
    let checkpoint = checkpoint_output_dim(&tensors, artifact.config.as_ref())
        .ok_or_else(|| EegError::artifact(repo_id.as_str(), "checkpoint has no classifier head"))?;
    if checkpoint != requested {
        return Err(EegError::TaxonomyMismatch {
            repo_id,
            checkpoint,
            requested,
        });
    }

    let mut hparams = infer_hparams(&tensors);
    if let Some(doc) = &artifact.config {
        hparams = hparams.with_doc_overrides(doc);
    }

    let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
    let model = EegNet::load(&hparams, channel_count, requested, vb)
        .map_err(|e| EegError::runtime("build classifier", e))?;

    tracing::info!(
        repo_id = %repo_id,
        f1 = hparams.f1,
        d = hparams.d,
        f2 = hparams.f2,
        k1 = hparams.k1,
        k2 = hparams.k2,
        classes = requested,
        channels = channel_count,
        "EEGNet bundle resolved"
    );

    Ok(ModelBundle {
        taxonomy: config.taxonomy,
        hparams,
        repo_id,
        config_doc: artifact.config,
        model,
        device,
    })
}
