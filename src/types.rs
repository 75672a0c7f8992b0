use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::taxonomy::ClassLabel;

/// Conditioned multichannel time series, channel-major, at the target rate.
/// Immutable once produced by the conditioner.
#[derive(Debug, Clone)]
pub struct RawSignal {
    pub data: Vec<Vec<f32>>,
    pub sample_rate_hz: f64,
}

impl RawSignal {
    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    pub fn sample_count(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }
}

/// Fixed-width slice of a [`RawSignal`]; one classification unit.
/// Segment order is time order and is preserved end to end.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start_sample: usize,
    /// `channels × window_samples`, profile channel order.
    pub data: Vec<Vec<f32>>,
}

/// Contiguous run of segment indices analyzed for the subject decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedWindow {
    pub start: usize,
    pub use_count: usize,
}

/// Decoded source data as handed over by a vendor decoder: per-channel
/// series keyed by source-native names, plus the native rate.
#[derive(Debug, Clone)]
pub struct DecodedRecording {
    pub channels: Vec<(String, Vec<f32>)>,
    pub sample_rate_hz: f64,
}

impl DecodedRecording {
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Input to [`crate::pipeline::runtime::EegPipeline::infer`]. Vendor-native
/// formats are decoded by external collaborators into [`DecodedRecording`];
/// tabular exports (timestamp column + one column per physical channel) are
/// read directly.
#[derive(Debug, Clone)]
pub enum RecordingSource {
    Csv(PathBuf),
    Decoded(DecodedRecording),
}

impl RecordingSource {
    pub(crate) fn path_hint(&self) -> Option<&str> {
        match self {
            Self::Csv(path) => path.to_str(),
            Self::Decoded(_) => None,
        }
    }
}

/// Per-call options of the pipeline entry point.
#[derive(Debug, Clone, Default)]
pub struct InferOptions {
    pub subject_hint: Option<String>,
    pub ground_truth: Option<String>,
    pub enforce_min_duration: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    /// Start of the selected window in seconds from recording start.
    pub start_seconds: f64,
    /// Mandatory minimum duration the window covers, in seconds.
    pub need_seconds: f64,
}

/// Pipeline output. Majority vote and subject-level argmax are reported
/// separately and may legitimately disagree; they are never reconciled.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceResult {
    pub channels_used: Vec<String>,
    pub subject_id: Option<String>,
    pub n_segments: usize,
    pub window: WindowReport,
    pub segment_counts: BTreeMap<&'static str, usize>,
    pub segment_majority_label: ClassLabel,
    pub segment_majority_index: usize,
    pub subject_probs: BTreeMap<&'static str, f32>,
    pub subject_pred_label: ClassLabel,
    pub segment_accuracy: Option<f64>,
    pub subject_accuracy: Option<f64>,
    pub repo_used: Option<String>,
}

/// Scans a path-like hint for a BIDS-style `sub-<digits>` subject id.
pub(crate) fn extract_subject_id(hint: &str) -> Option<String> {
    let normalized = hint.replace('\\', "/");
    let mut search = normalized.as_str();
    while let Some(pos) = search.find("sub-") {
        let digits: String = search[pos + 4..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if !digits.is_empty() {
            return Some(format!("sub-{digits}"));
        }
        search = &search[pos + 4..];
    }
    None
}
