//! Subject-level aggregation over the selected window.
//!
//! Two independent reads of the same evidence: a per-segment majority vote
//! and a quality-weighted probability average. They can disagree (many
//! weak votes one way, a few confident segments the other) and both are
//! reported as-is.

use std::collections::BTreeMap;

use crate::taxonomy::{ClassLabel, ClassTaxonomy};

/// Contribution weight of a flagged-bad segment. Strongly down-weighted
/// rather than zero so an all-bad window still yields a valid distribution.
const BAD_SEGMENT_WEIGHT: f32 = 1e-3;

#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub segment_counts: BTreeMap<&'static str, usize>,
    pub majority_index: usize,
    pub majority_label: ClassLabel,
    pub subject_probs: BTreeMap<&'static str, f32>,
    pub subject_index: usize,
    pub subject_label: ClassLabel,
    pub segment_accuracy: Option<f64>,
    pub subject_accuracy: Option<f64>,
}

/// Aggregates calibrated per-segment probabilities (`window_probs`, one
/// vector per in-window segment) with the matching quality flags.
pub fn aggregate(
    taxonomy: ClassTaxonomy,
    window_probs: &[Vec<f32>],
    bad_flags: &[bool],
    ground_truth: Option<&str>,
) -> AggregateOutcome {
    let n_classes = taxonomy.len();
    debug_assert_eq!(window_probs.len(), bad_flags.len());

    // (a) Per-segment argmax tally; ties on counts break to the lowest
    // class index.
    let predictions: Vec<usize> = window_probs.iter().map(|p| argmax(p)).collect();
    let mut counts = vec![0usize; n_classes];
    for &p in &predictions {
        counts[p] += 1;
    }
    let majority_index = argmax_usize(&counts);

    // (b) Quality-weighted subject distribution.
    let weights: Vec<f32> = bad_flags
        .iter()
        .map(|&bad| if bad { BAD_SEGMENT_WEIGHT } else { 1.0 })
        .collect();
    let weight_sum: f32 = weights.iter().sum::<f32>() + 1e-8;
    let mut subject = vec![0.0f32; n_classes];
    for (probs, &w) in window_probs.iter().zip(&weights) {
        for (acc, &p) in subject.iter_mut().zip(probs) {
            *acc += p * (w / weight_sum);
        }
    }
    let subject_index = argmax(&subject);

    // (c) Accuracy against normalized ground truth; out-of-taxonomy labels
    // normalize to absent.
    let truth_index = ground_truth
        .and_then(|raw| taxonomy.normalize_label(raw))
        .and_then(|label| taxonomy.index_of(label));
    let (segment_accuracy, subject_accuracy) = match truth_index {
        Some(truth) if !predictions.is_empty() => {
            let matching = predictions.iter().filter(|&&p| p == truth).count();
            (
                Some(matching as f64 / predictions.len() as f64),
                Some(if subject_index == truth { 1.0 } else { 0.0 }),
            )
        }
        _ => (None, None),
    };

    let labels = taxonomy.labels();
    AggregateOutcome {
        segment_counts: labels
            .iter()
            .zip(&counts)
            .map(|(l, &c)| (l.as_str(), c))
            .collect(),
        majority_index,
        majority_label: labels[majority_index],
        subject_probs: labels
            .iter()
            .zip(&subject)
            .map(|(l, &p)| (l.as_str(), p))
            .collect(),
        subject_index,
        subject_label: labels[subject_index],
        segment_accuracy,
        subject_accuracy,
    }
}

/// First-maximum argmax, i.e. ties break to the lowest index.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0usize;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn argmax_usize(values: &[usize]) -> usize {
    let mut best = 0usize;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
