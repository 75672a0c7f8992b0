use std::sync::Arc;

use crate::channels::{profile_for, validate_physical_order};
use crate::config::{CalibrationConfig, EegConfig};
use crate::error::EegError;
use crate::model::artifacts::ArtifactStore;
use crate::model::bundle::{resolve_bundle, BundleKey};
use crate::pipeline::cache::EngineCache;
use crate::pipeline::runtime::{EegPipeline, EegPipelineParts};
use crate::pipeline::traits::{CandleClassifierBackend, ClassifierBackend};
use crate::signal::quality::{QualityScorer, StdRatioScorer};

pub struct EegPipelineBuilder {
    config: EegConfig,
    artifact_store: Option<Box<dyn ArtifactStore>>,
    classifier: Option<Box<dyn ClassifierBackend>>,
    quality_scorer: Option<Box<dyn QualityScorer>>,
    cache: Option<Arc<EngineCache>>,
}

impl EegPipelineBuilder {
    pub fn new(config: EegConfig) -> Self {
        Self {
            config,
            artifact_store: None,
            classifier: None,
            quality_scorer: None,
            cache: None,
        }
    }

    pub fn with_artifact_store(mut self, store: Box<dyn ArtifactStore>) -> Self {
        self.artifact_store = Some(store);
        self
    }

    /// Bypasses artifact resolution entirely; the injected backend is used
    /// as-is and no checkpoint is fetched.
    pub fn with_classifier_backend(mut self, backend: Box<dyn ClassifierBackend>) -> Self {
        self.classifier = Some(backend);
        self
    }

    pub fn with_quality_scorer(mut self, scorer: Box<dyn QualityScorer>) -> Self {
        self.quality_scorer = Some(scorer);
        self
    }

    /// Shares a bundle cache across pipelines; without one the pipeline
    /// owns a private cache.
    pub fn with_engine_cache(mut self, cache: Arc<EngineCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<EegPipeline, EegError> {
        let profile = profile_for(&self.config.device_id)?;
        if let Some(order) = &self.config.physical_order {
            validate_physical_order(profile, order)?;
        }
        let channel_names: Vec<String> =
            profile.channels.iter().map(|c| c.to_string()).collect();

        let (backend, calibration, repo_used): (Box<dyn ClassifierBackend>, _, _) =
            if let Some(backend) = self.classifier {
                let calibration = CalibrationConfig::resolve(
                    self.config.taxonomy,
                    None,
                    &self.config.calibration,
                );
                (backend, calibration, None)
            } else {
                let store = self.artifact_store.ok_or_else(|| {
                    EegError::invalid_input(
                        "an artifact store is required unless a classifier backend is injected",
                    )
                })?;
                let cache = self.cache.unwrap_or_default();
                let key = BundleKey::for_config(&self.config, &channel_names);
                let bundle = cache.get_or_build(key, || {
                    resolve_bundle(store.as_ref(), &self.config, profile.channels.len())
                })?;
                let calibration = CalibrationConfig::resolve(
                    self.config.taxonomy,
                    bundle.config_doc.as_ref(),
                    &self.config.calibration,
                );
                let repo_used = Some(bundle.repo_id.clone());
                let backend: Box<dyn ClassifierBackend> = Box::new(
                    CandleClassifierBackend::new(bundle, self.config.batch_size),
                );
                (backend, calibration, repo_used)
            };

        tracing::info!(
            device = %self.config.device_id,
            taxonomy = ?self.config.taxonomy,
            backend = %backend.backend_label(),
            repo = repo_used.as_deref().unwrap_or("<injected>"),
            "EEG pipeline ready"
        );

        Ok(EegPipeline::from_parts(EegPipelineParts {
            config: self.config,
            profile,
            channel_names,
            backend,
            calibration,
            quality_scorer: self
                .quality_scorer
                .unwrap_or_else(|| Box::new(StdRatioScorer::default())),
            repo_used,
        }))
    }
}
