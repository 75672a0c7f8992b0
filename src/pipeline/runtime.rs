use crate::aggregate::aggregate;
use crate::calibrate::calibrate;
use crate::channels::{resolve_channels, ChannelProfile};
use crate::config::{CalibrationConfig, EegConfig};
use crate::error::EegError;
use crate::pipeline::traits::ClassifierBackend;
use crate::signal::conditioner::condition;
use crate::signal::csv_source::load_csv_recording;
use crate::signal::quality::QualityScorer;
use crate::signal::segment::{per_record_zscore, segment_signal};
use crate::signal::window::select_window;
use crate::types::{
    extract_subject_id, DecodedRecording, InferOptions, InferenceResult, RecordingSource,
    WindowReport,
};

/// Subject-level inference pipeline: channel resolution, conditioning,
/// segmentation, quality scoring, window selection, classification,
/// calibration, aggregation. Synchronous per invocation; safe to share
/// across threads.
pub struct EegPipeline {
    config: EegConfig,
    profile: &'static ChannelProfile,
    channel_names: Vec<String>,
    backend: Box<dyn ClassifierBackend>,
    calibration: CalibrationConfig,
    quality_scorer: Box<dyn QualityScorer>,
    repo_used: Option<String>,
}

pub(crate) struct EegPipelineParts {
    pub config: EegConfig,
    pub profile: &'static ChannelProfile,
    pub channel_names: Vec<String>,
    pub backend: Box<dyn ClassifierBackend>,
    pub calibration: CalibrationConfig,
    pub quality_scorer: Box<dyn QualityScorer>,
    pub repo_used: Option<String>,
}

impl std::fmt::Debug for EegPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EegPipeline")
            .field("channel_names", &self.channel_names)
            .field("repo_used", &self.repo_used)
            .finish_non_exhaustive()
    }
}

impl EegPipeline {
    pub(crate) fn from_parts(parts: EegPipelineParts) -> Self {
        Self {
            config: parts.config,
            profile: parts.profile,
            channel_names: parts.channel_names,
            backend: parts.backend,
            calibration: parts.calibration,
            quality_scorer: parts.quality_scorer,
            repo_used: parts.repo_used,
        }
    }

    pub fn repo_used(&self) -> Option<&str> {
        self.repo_used.as_deref()
    }

    /// Runs the full pipeline for one recording.
    pub fn infer(
        &self,
        source: &RecordingSource,
        opts: &InferOptions,
    ) -> Result<InferenceResult, EegError> {
        let recording = self.load_source(source)?;
        let subject_id = opts
            .subject_hint
            .clone()
            .or_else(|| source.path_hint().and_then(extract_subject_id));

        let (channels, native_rate) = self.resolve_source_channels(recording)?;
        let signal = condition(channels, native_rate, &self.config);

        let segments = segment_signal(
            &signal,
            self.config.window_samples(),
            self.config.hop_samples(),
        );
        if segments.is_empty() {
            return Err(EegError::invalid_input(
                "no segments could be formed from the recording",
            ));
        }
        let flags = self
            .quality_scorer
            .score(&segments, signal.sample_rate_hz);

        let need = self.config.need_segments();
        let window = select_window(&flags, need, opts.enforce_min_duration)?;
        tracing::debug!(
            total_segments = segments.len(),
            window_start = window.start,
            window_use = window.use_count,
            "analysis window selected"
        );

        // Normalization statistics come from the whole recording; only the
        // selected window is classified.
        let normalized = per_record_zscore(&segments);
        let window_segments = &normalized[window.start..window.start + window.use_count];
        let window_flags = &flags[window.start..window.start + window.use_count];

        let raw_scores = self.backend.classify(window_segments)?;
        let n_classes = self.config.taxonomy.len();
        if raw_scores.len() != window_segments.len()
            || raw_scores.iter().any(|row| row.len() != n_classes)
        {
            return Err(EegError::runtime(
                "classifier output",
                format!(
                    "expected {} score vectors of length {n_classes}",
                    window_segments.len()
                ),
            ));
        }

        let probs = calibrate(&raw_scores, &self.calibration);
        let outcome = aggregate(
            self.config.taxonomy,
            &probs,
            window_flags,
            opts.ground_truth.as_deref(),
        );

        Ok(InferenceResult {
            channels_used: self.channel_names.clone(),
            subject_id,
            n_segments: window.use_count,
            window: WindowReport {
                start_seconds: window.start as f64 * self.config.hop_seconds,
                need_seconds: self.config.min_window_seconds,
            },
            segment_counts: outcome.segment_counts,
            segment_majority_label: outcome.majority_label,
            segment_majority_index: outcome.majority_index,
            subject_probs: outcome.subject_probs,
            subject_pred_label: outcome.subject_label,
            segment_accuracy: outcome.segment_accuracy,
            subject_accuracy: outcome.subject_accuracy,
            repo_used: self.repo_used.clone(),
        })
    }

    fn load_source(&self, source: &RecordingSource) -> Result<DecodedRecording, EegError> {
        match source {
            RecordingSource::Csv(path) => load_csv_recording(path),
            RecordingSource::Decoded(recording) => Ok(recording.clone()),
        }
    }

    /// Applies the configured physical order, resolves the canonical
    /// profile against the source names, and materializes the channel
    /// series in profile order (zero-filled where lenient resolution
    /// allowed a gap).
    fn resolve_source_channels(
        &self,
        recording: DecodedRecording,
    ) -> Result<(Vec<Vec<f32>>, f64), EegError> {
        let DecodedRecording {
            mut channels,
            sample_rate_hz,
        } = recording;

        if let Some(order) = &self.config.physical_order {
            if order.len() != channels.len() {
                return Err(EegError::invalid_input(format!(
                    "physical channel order has {} entries but the source has {} channels",
                    order.len(),
                    channels.len()
                )));
            }
            for ((name, _), physical) in channels.iter_mut().zip(order) {
                *name = physical.clone();
            }
        }

        let source_names: Vec<String> = channels.iter().map(|(n, _)| n.clone()).collect();
        let resolved = resolve_channels(
            self.profile,
            &source_names,
            self.config.lenient_channels,
        )?;

        let length = resolved
            .assignments
            .iter()
            .flatten()
            .map(|&i| channels[i].1.len())
            .min()
            .unwrap_or(0);

        let data = resolved
            .assignments
            .iter()
            .map(|assignment| match assignment {
                Some(i) => channels[*i].1[..length].to_vec(),
                None => vec![0.0f32; length],
            })
            .collect();

        Ok((data, sample_rate_hz))
    }
}
