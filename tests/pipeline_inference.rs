use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::Arc;

use candle_core::{DType, Device, Tensor};

use eegnet_rs::error::EegError;
use eegnet_rs::types::Segment;
use eegnet_rs::{
    ClassLabel, ClassTaxonomy, ClassifierBackend, DecodedRecording, DirArtifactStore, EegConfig,
    EegPipelineBuilder, EngineCache, InferOptions, RecordingSource,
};

/// Deterministic backend standing in for the candle network: a fixed
/// score vector per segment.
struct FixedScoreBackend {
    scores: Vec<f32>,
}

impl ClassifierBackend for FixedScoreBackend {
    fn classify(&self, segments: &[Segment]) -> Result<Vec<Vec<f32>>, EegError> {
        Ok(vec![self.scores.clone(); segments.len()])
    }

    fn backend_label(&self) -> String {
        "fixed".to_string()
    }
}

/// Synthetic multichannel recording: one distinct in-band rhythm per
/// channel so conditioning and quality scoring see realistic variance.
fn synthetic_recording(names: &[&str], rate: f64, seconds: f64) -> DecodedRecording {
    let samples = (rate * seconds) as usize;
    let channels = names
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let freq = 8.0 + c as f32 * 2.0;
            let series = (0..samples)
                .map(|i| {
                    let t = i as f32 / rate as f32;
                    (TAU * freq * t).sin() + 0.3 * (TAU * 1.7 * t + c as f32).sin()
                })
                .collect();
            (name.to_string(), series)
        })
        .collect();
    DecodedRecording {
        channels,
        sample_rate_hz: rate,
    }
}

fn mock_pipeline(taxonomy: ClassTaxonomy, scores: Vec<f32>) -> eegnet_rs::EegPipeline {
    EegPipelineBuilder::new(EegConfig::new("muse", taxonomy))
        .with_classifier_backend(Box::new(FixedScoreBackend { scores }))
        .build()
        .expect("mock pipeline builds")
}

#[test]
fn long_recording_selects_the_minimum_duration_window() {
    // 130 s at a 256 Hz native rate: resampling to 250 Hz yields 32 500
    // samples, i.e. 51 segments of which 47 cover the two-minute window.
    let pipeline = mock_pipeline(ClassTaxonomy::TwoClass, vec![2.0, 0.0]);
    let recording = synthetic_recording(&["T5", "T6", "F7", "F8"], 256.0, 130.0);
    let opts = InferOptions {
        subject_hint: Some("sub-001".to_string()),
        ground_truth: Some("C".to_string()),
        enforce_min_duration: true,
    };

    let result = pipeline
        .infer(&RecordingSource::Decoded(recording), &opts)
        .expect("long recording passes enforcement");

    assert_eq!(result.n_segments, 47);
    assert_eq!(result.window.need_seconds, 120.0);
    assert!(result.window.start_seconds <= 4.0 * 2.5);
    assert_eq!(result.channels_used, vec!["T5", "T6", "F7", "F8"]);
    assert_eq!(result.subject_id.as_deref(), Some("sub-001"));

    // Fixed pro-CN scores: unanimous vote and matching subject argmax.
    assert_eq!(result.segment_counts["CN"], 47);
    assert_eq!(result.segment_counts["AD"], 0);
    assert_eq!(result.segment_majority_label, ClassLabel::Cn);
    assert_eq!(result.segment_majority_index, 0);
    assert_eq!(result.subject_pred_label, ClassLabel::Cn);
    assert!(result.subject_probs["CN"] > 0.8);
    let total: f32 = result.subject_probs.values().sum();
    assert!((total - 1.0).abs() < 1e-3);

    // Ground truth "C" normalizes to CN.
    assert_eq!(result.segment_accuracy, Some(1.0));
    assert_eq!(result.subject_accuracy, Some(1.0));
    assert!(result.repo_used.is_none());
}

#[test]
fn short_recording_fails_only_when_enforced() {
    let pipeline = mock_pipeline(ClassTaxonomy::TwoClass, vec![2.0, 0.0]);
    let recording = synthetic_recording(&["T5", "T6", "F7", "F8"], 256.0, 100.0);

    let enforced = InferOptions {
        enforce_min_duration: true,
        ..Default::default()
    };
    let err = pipeline
        .infer(&RecordingSource::Decoded(recording.clone()), &enforced)
        .expect_err("100 s cannot cover the two-minute window");
    match err {
        EegError::InsufficientDuration { need, got } => {
            assert_eq!(need, 47);
            assert_eq!(got, 39);
        }
        other => panic!("unexpected error: {other}"),
    }

    let waived = InferOptions::default();
    let result = pipeline
        .infer(&RecordingSource::Decoded(recording), &waived)
        .expect("waived enforcement uses all segments");
    assert_eq!(result.n_segments, 39);
    assert_eq!(result.window.start_seconds, 0.0);
}

#[test]
fn vendor_channel_names_resolve_through_aliases() {
    let pipeline = mock_pipeline(ClassTaxonomy::TwoClass, vec![0.0, 1.0]);
    // Muse headband naming; resolution maps it back to the training order.
    let recording = synthetic_recording(&["TP9", "AF7", "AF8", "TP10"], 250.0, 130.0);
    let result = pipeline
        .infer(
            &RecordingSource::Decoded(recording),
            &InferOptions {
                enforce_min_duration: true,
                ..Default::default()
            },
        )
        .expect("aliases resolve");
    assert_eq!(result.channels_used, vec!["T5", "T6", "F7", "F8"]);
    assert_eq!(result.subject_pred_label, ClassLabel::Ad);
}

#[test]
fn missing_channels_fail_resolution_by_name() {
    let pipeline = mock_pipeline(ClassTaxonomy::TwoClass, vec![1.0, 0.0]);
    let recording = synthetic_recording(&["T5", "T6"], 250.0, 130.0);
    let err = pipeline
        .infer(&RecordingSource::Decoded(recording), &InferOptions::default())
        .expect_err("F7/F8 are unresolvable");
    match err {
        EegError::ChannelResolution { missing, .. } => {
            assert_eq!(missing, vec!["F7".to_string(), "F8".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn muse_tabular_export_resolves_with_physical_order() {
    // Headband export: generic column names, physical order declared by
    // the caller, vendor electrode names mapped back through aliases.
    let path = std::env::temp_dir().join("eegnet_rs_it_sub-123_rest.csv");
    let rate = 250.0f64;
    let mut contents = String::from("timestamps,eeg_1,eeg_2,eeg_3,eeg_4\n");
    for i in 0..7500 {
        let t = i as f64 / rate;
        contents.push_str(&format!(
            "{:.6},{:.5},{:.5},{:.5},{:.5}\n",
            t,
            (TAU as f64 * 8.0 * t).sin(),
            (TAU as f64 * 10.0 * t).sin(),
            (TAU as f64 * 12.0 * t).sin(),
            (TAU as f64 * 14.0 * t).sin(),
        ));
    }
    std::fs::write(&path, contents).expect("write export");

    let mut config = EegConfig::new("muse", ClassTaxonomy::TwoClass);
    config.physical_order = Some(
        ["TP9", "AF7", "AF8", "TP10"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    let pipeline = EegPipelineBuilder::new(config)
        .with_classifier_backend(Box::new(FixedScoreBackend {
            scores: vec![2.0, 0.0],
        }))
        .build()
        .expect("pipeline builds");

    let result = pipeline
        .infer(&RecordingSource::Csv(path.clone()), &InferOptions::default())
        .expect("export resolves");
    assert_eq!(result.channels_used, vec!["T5", "T6", "F7", "F8"]);
    assert_eq!(result.n_segments, 11);
    assert_eq!(result.subject_id.as_deref(), Some("sub-123"));

    let _ = std::fs::remove_file(&path);
}

// ---- real-bundle path: synthetic checkpoint through the artifact store ----

fn bn_stats(prefix: &str, c: usize, map: &mut HashMap<String, Tensor>) {
    let dev = Device::Cpu;
    map.insert(
        format!("{prefix}.weight"),
        Tensor::ones(c, DType::F32, &dev).expect("bn weight"),
    );
    map.insert(
        format!("{prefix}.bias"),
        Tensor::zeros(c, DType::F32, &dev).expect("bn bias"),
    );
    map.insert(
        format!("{prefix}.running_mean"),
        Tensor::zeros(c, DType::F32, &dev).expect("bn mean"),
    );
    map.insert(
        format!("{prefix}.running_var"),
        Tensor::ones(c, DType::F32, &dev).expect("bn var"),
    );
}

/// Writes a small but shape-consistent EEGNet checkpoint for `channels`
/// input channels and `n_classes` outputs.
fn write_checkpoint(dir: &std::path::Path, channels: usize, n_classes: usize) {
    let dev = Device::Cpu;
    let (f1, d, f2, k1, k2) = (4usize, 2usize, 8usize, 17usize, 9usize);
    let f_mid = f1 * d;
    let mut map = HashMap::new();
    map.insert(
        "firstconv.0.weight".to_string(),
        Tensor::full(0.01f32, (f1, 1, 1, k1), &dev).expect("w"),
    );
    bn_stats("firstconv.1", f1, &mut map);
    map.insert(
        "depthwise.0.weight".to_string(),
        Tensor::full(0.02f32, (f_mid, 1, channels, 1), &dev).expect("w"),
    );
    bn_stats("depthwise.1", f_mid, &mut map);
    map.insert(
        "separable.0.weight".to_string(),
        Tensor::full(0.03f32, (f_mid, 1, 1, k2), &dev).expect("w"),
    );
    map.insert(
        "separable.1.weight".to_string(),
        Tensor::full(0.04f32, (f2, f_mid, 1, 1), &dev).expect("w"),
    );
    bn_stats("separable.2", f2, &mut map);
    map.insert(
        "classifier.weight".to_string(),
        Tensor::full(0.05f32, (n_classes, f2), &dev).expect("w"),
    );
    map.insert(
        "classifier.bias".to_string(),
        Tensor::zeros(n_classes, DType::F32, &dev).expect("b"),
    );

    std::fs::create_dir_all(dir).expect("create repo dir");
    candle_core::safetensors::save(&map, dir.join("model.safetensors")).expect("save checkpoint");
}

fn store_root(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("eegnet_rs_it_{tag}"))
}

#[test]
fn resolved_bundle_classifies_and_is_cached() {
    let root = store_root("bundle_cache");
    let _ = std::fs::remove_dir_all(&root);
    write_checkpoint(
        &root.join("eegnet").join("EEGNetV4-4ch-muse-Ver14"),
        4,
        2,
    );

    let cache = Arc::new(EngineCache::new());
    let build = || {
        EegPipelineBuilder::new(EegConfig::new("muse", ClassTaxonomy::TwoClass))
            .with_artifact_store(Box::new(DirArtifactStore::new(&root)))
            .with_engine_cache(Arc::clone(&cache))
            .build()
            .expect("bundle resolves")
    };

    let pipeline = build();
    assert_eq!(
        pipeline.repo_used(),
        Some("eegnet/EEGNetV4-4ch-muse-Ver14")
    );

    let recording = synthetic_recording(&["T5", "T6", "F7", "F8"], 250.0, 30.0);
    let result = pipeline
        .infer(&RecordingSource::Decoded(recording), &InferOptions::default())
        .expect("short recording passes without enforcement");
    assert_eq!(result.n_segments, 11);
    let total: f32 = result.subject_probs.values().sum();
    assert!((total - 1.0).abs() < 1e-3);
    assert!(result.subject_probs.values().all(|p| p.is_finite()));
    let counted: usize = result.segment_counts.values().sum();
    assert_eq!(counted, 11);

    // Second pipeline over the same cache reuses the resident bundle.
    let _second = build();
    assert_eq!(cache.resident_bundles(), 1);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn taxonomy_mismatch_is_fatal_before_inference() {
    let root = store_root("taxonomy_mismatch");
    let _ = std::fs::remove_dir_all(&root);
    // Three-class checkpoint published under the repo the two-class
    // pipeline resolves.
    write_checkpoint(
        &root.join("eegnet").join("EEGNetV4-4ch-muse-Ver14"),
        4,
        3,
    );

    let err = EegPipelineBuilder::new(EegConfig::new("muse", ClassTaxonomy::TwoClass))
        .with_artifact_store(Box::new(DirArtifactStore::new(&root)))
        .build()
        .expect_err("output dimension mismatch must be fatal");
    match err {
        EegError::TaxonomyMismatch {
            checkpoint,
            requested,
            ..
        } => {
            assert_eq!(checkpoint, 3);
            assert_eq!(requested, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn failed_artifact_fetch_does_not_poison_the_cache() {
    let root = store_root("retryable_fetch");
    let _ = std::fs::remove_dir_all(&root);
    let cache = Arc::new(EngineCache::new());
    let build = |cache: &Arc<EngineCache>| {
        EegPipelineBuilder::new(EegConfig::new("muse", ClassTaxonomy::TwoClass))
            .with_artifact_store(Box::new(DirArtifactStore::new(&root)))
            .with_engine_cache(Arc::clone(cache))
            .build()
    };

    let err = build(&cache).expect_err("repository does not exist yet");
    assert!(matches!(err, EegError::ArtifactUnavailable { .. }));
    assert_eq!(cache.resident_bundles(), 0);

    // Publishing the checkpoint afterwards lets the same cache recover.
    write_checkpoint(
        &root.join("eegnet").join("EEGNetV4-4ch-muse-Ver14"),
        4,
        2,
    );
    build(&cache).expect("retry succeeds after publication");
    assert_eq!(cache.resident_bundles(), 1);

    let _ = std::fs::remove_dir_all(&root);
}
