//! Post-hoc score calibration: temperature scaling, class-prior log-odds
//! injection, decision-bias subtraction, then softmax. Every adjustment
//! defaults to identity, so an unconfigured calibrator is plain softmax.

use crate::config::CalibrationConfig;

/// Calibrates one batch of raw per-segment score vectors into probability
/// vectors. Pure: identical scores and config always yield identical
/// output.
pub fn calibrate(raw_scores: &[Vec<f32>], config: &CalibrationConfig) -> Vec<Vec<f32>> {
    let temperature = config.temperature.max(1e-3);
    raw_scores
        .iter()
        .map(|scores| {
            let mut z: Vec<f32> = scores.iter().map(|&s| s / temperature).collect();
            if config.prior_strength > 0.0 {
                if let Some(prior) = &config.class_prior {
                    for (zi, &p) in z.iter_mut().zip(prior) {
                        *zi += config.prior_strength * p.max(1e-9).ln();
                    }
                }
            }
            for (zi, &b) in z.iter_mut().zip(&config.decision_bias) {
                *zi -= b;
            }
            softmax(&z)
        })
        .collect()
}

pub(crate) fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exp.iter().sum::<f32>() + 1e-12;
    exp.into_iter().map(|e| e / sum).collect()
}
