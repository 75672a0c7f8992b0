use std::collections::HashMap;

use crate::taxonomy::{ClassTaxonomy, ClassLabel};

/// Pipeline configuration. Defaults mirror the published checkpoint
/// training setup; override what the deployment needs and leave the rest.
#[derive(Debug, Clone)]
pub struct EegConfig {
    /// Device identifier selecting the channel profile and the artifact
    /// repository naming (`muse`, `hybrid_black`, `union10`, `total19`).
    pub device_id: String,
    pub taxonomy: ClassTaxonomy,
    /// Checkpoint version tag embedded in the repository id.
    pub version: String,
    /// Optional variant comment appended to the repository id
    /// (e.g. `2Class-extradataset`).
    pub variant: Option<String>,
    /// Namespace prefix of artifact repository ids.
    pub repo_namespace: String,
    /// Source-native physical channel order, positionally assigned to the
    /// tabular source's data columns. Must match the profile's channel
    /// count when present.
    pub physical_order: Option<Vec<String>>,
    /// When set, unresolvable channels are zero-filled instead of failing.
    pub lenient_channels: bool,
    pub target_rate_hz: f64,
    pub band_low_hz: f64,
    pub band_high_hz: f64,
    pub window_seconds: f64,
    pub hop_seconds: f64,
    /// Mandatory minimum duration the selected window must cover.
    pub min_window_seconds: f64,
    pub batch_size: usize,
    /// Compute device for the classifier: `cpu` or `cuda`.
    pub compute_device: String,
    /// Caller-side calibration overrides; take precedence over values from
    /// the artifact configuration document.
    pub calibration: CalibrationOverrides,
}

impl EegConfig {
    pub const DEFAULT_TARGET_RATE_HZ: f64 = 250.0;
    pub const DEFAULT_BAND_LOW_HZ: f64 = 1.0;
    pub const DEFAULT_BAND_HIGH_HZ: f64 = 40.0;
    pub const DEFAULT_WINDOW_SECONDS: f64 = 5.0;
    pub const DEFAULT_HOP_SECONDS: f64 = 2.5;
    pub const DEFAULT_MIN_WINDOW_SECONDS: f64 = 120.0;
    pub const DEFAULT_BATCH_SIZE: usize = 64;

    pub fn new(device_id: impl Into<String>, taxonomy: ClassTaxonomy) -> Self {
        Self {
            device_id: device_id.into(),
            taxonomy,
            ..Self::default()
        }
    }

    pub(crate) fn window_samples(&self) -> usize {
        (self.window_seconds * self.target_rate_hz).round() as usize
    }

    pub(crate) fn hop_samples(&self) -> usize {
        ((self.hop_seconds * self.target_rate_hz).round() as usize).max(1)
    }

    /// Segment count required to cover the mandatory minimum duration.
    pub(crate) fn need_segments(&self) -> usize {
        ((self.min_window_seconds - self.window_seconds) / self.hop_seconds).floor() as usize + 1
    }
}

impl Default for EegConfig {
    fn default() -> Self {
        Self {
            device_id: "muse".to_string(),
            taxonomy: ClassTaxonomy::ThreeClass,
            version: "Ver14".to_string(),
            variant: None,
            repo_namespace: "eegnet".to_string(),
            physical_order: None,
            lenient_channels: false,
            target_rate_hz: Self::DEFAULT_TARGET_RATE_HZ,
            band_low_hz: Self::DEFAULT_BAND_LOW_HZ,
            band_high_hz: Self::DEFAULT_BAND_HIGH_HZ,
            window_seconds: Self::DEFAULT_WINDOW_SECONDS,
            hop_seconds: Self::DEFAULT_HOP_SECONDS,
            min_window_seconds: Self::DEFAULT_MIN_WINDOW_SECONDS,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            compute_device: "cpu".to_string(),
            calibration: CalibrationOverrides::default(),
        }
    }
}

/// Caller-side calibration overrides. `None` defers to the artifact
/// configuration document, which in turn defers to identity defaults.
#[derive(Debug, Clone, Default)]
pub struct CalibrationOverrides {
    pub temperature: Option<f32>,
    pub prior_strength: Option<f32>,
    pub class_prior: Option<HashMap<ClassLabel, f32>>,
    pub decision_bias: Option<Vec<f32>>,
}

/// Resolved calibration applied to raw classifier scores. Immutable per
/// bundle; identity when nothing is configured.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    pub temperature: f32,
    pub prior_strength: f32,
    /// Normalized probability vector over the taxonomy, when configured.
    pub class_prior: Option<Vec<f32>>,
    pub decision_bias: Vec<f32>,
}

impl CalibrationConfig {
    pub fn identity(n_classes: usize) -> Self {
        Self {
            temperature: 1.0,
            prior_strength: 0.0,
            class_prior: None,
            decision_bias: vec![0.0; n_classes],
        }
    }

    /// Resolves the effective calibration for a taxonomy with the
    /// documented precedence: caller override > artifact document > default.
    pub fn resolve(
        taxonomy: ClassTaxonomy,
        doc: Option<&ArtifactConfigDoc>,
        overrides: &CalibrationOverrides,
    ) -> Self {
        let n = taxonomy.len();
        let mut cfg = Self::identity(n);

        if let Some(doc) = doc {
            if let Some(t) = doc.temperature {
                cfg.temperature = t;
            }
            if let Some(s) = doc.prior_strength {
                cfg.prior_strength = s;
            }
            if let Some(prior) = &doc.class_prior {
                cfg.class_prior = normalize_prior(taxonomy, prior);
            }
            if let Some(bias) = &doc.decision_bias {
                if bias.len() >= n {
                    cfg.decision_bias = bias[..n].to_vec();
                }
            }
        }

        if let Some(t) = overrides.temperature {
            cfg.temperature = t;
        }
        if let Some(s) = overrides.prior_strength {
            cfg.prior_strength = s;
        }
        if let Some(prior) = &overrides.class_prior {
            let by_name: HashMap<String, f32> = prior
                .iter()
                .map(|(label, &p)| (label.as_str().to_string(), p))
                .collect();
            cfg.class_prior = normalize_prior(taxonomy, &by_name);
        }
        if let Some(bias) = &overrides.decision_bias {
            if bias.len() >= n {
                cfg.decision_bias = bias[..n].to_vec();
            }
        }

        cfg.temperature = cfg.temperature.max(1e-3);
        cfg.prior_strength = cfg.prior_strength.max(0.0);
        cfg
    }
}

fn normalize_prior(taxonomy: ClassTaxonomy, by_name: &HashMap<String, f32>) -> Option<Vec<f32>> {
    let uniform = 1.0 / taxonomy.len() as f32;
    let raw: Vec<f32> = taxonomy
        .labels()
        .iter()
        .map(|label| {
            by_name
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(label.as_str()))
                .map_or(uniform, |(_, &p)| p)
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    if sum <= 1e-6 {
        return None;
    }
    Some(raw.into_iter().map(|p| p / sum).collect())
}

fn default_dropout() -> f32 {
    0.3
}

/// Artifact-side configuration document: `config.json` merged with
/// `calibration.json` from the checkpoint repository. Every field is
/// optional; absent hyperparameters are inferred from weight shapes.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ArtifactConfigDoc {
    pub kernel_length: Option<usize>,
    pub sep_length: Option<usize>,
    #[serde(rename = "F1")]
    pub f1: Option<usize>,
    #[serde(rename = "D")]
    pub d: Option<usize>,
    pub pool1: Option<usize>,
    pub pool2: Option<usize>,
    #[serde(default = "default_dropout")]
    pub dropout_rate: f32,
    pub num_classes: Option<usize>,
    pub temperature: Option<f32>,
    pub prior_strength: Option<f32>,
    /// Label name -> prior probability, e.g. `{"CN": 0.5, "AD": 0.5}`.
    pub class_prior: Option<HashMap<String, f32>>,
    pub decision_bias: Option<Vec<f32>>,
}
