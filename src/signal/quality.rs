//! Segment quality scoring.
//!
//! Contract: a segment whose amplitude/variance statistics are anomalous
//! relative to the rest of the recording is unreliable. Two scorers
//! implement it with different sensitivity; one is chosen per pipeline and
//! applied consistently to both window selection and aggregation weights.

use crate::types::Segment;

pub trait QualityScorer: Send + Sync {
    /// Flags each segment (`true` = bad). Pure function of the segment
    /// contents; no hidden state.
    fn score(&self, segments: &[Segment], sample_rate_hz: f64) -> Vec<bool>;
}

/// Default scorer: a segment is bad when its standard deviation collapses
/// below a fraction of the across-segment median, which catches flatlined
/// electrodes and dropouts.
#[derive(Debug, Clone, Copy)]
pub struct StdRatioScorer {
    pub ratio: f32,
}

impl Default for StdRatioScorer {
    fn default() -> Self {
        Self { ratio: 0.2 }
    }
}

impl QualityScorer for StdRatioScorer {
    fn score(&self, segments: &[Segment], _sample_rate_hz: f64) -> Vec<bool> {
        if segments.is_empty() {
            return Vec::new();
        }
        let stds: Vec<f32> = segments.iter().map(segment_std).collect();
        let mut sorted = stds.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = sorted[sorted.len() / 2];
        stds.iter()
            .map(|&s| s < self.ratio * median + 1e-8)
            .collect()
    }
}

/// Stricter scorer: robust z-scores (median/MAD) of the per-segment peak
/// amplitude and of the low-frequency envelope; either exceeding its
/// threshold marks the segment bad. Catches motion/blink artifacts the
/// variance-collapse test cannot see.
#[derive(Debug, Clone, Copy)]
pub struct RobustAmplitudeScorer {
    pub ptp_z_threshold: f32,
    pub envelope_z_threshold: f32,
    pub envelope_window_seconds: f64,
}

impl Default for RobustAmplitudeScorer {
    fn default() -> Self {
        Self {
            ptp_z_threshold: 5.0,
            envelope_z_threshold: 3.0,
            envelope_window_seconds: 0.5,
        }
    }
}

impl QualityScorer for RobustAmplitudeScorer {
    fn score(&self, segments: &[Segment], sample_rate_hz: f64) -> Vec<bool> {
        if segments.is_empty() {
            return Vec::new();
        }

        // Worst channel peak-to-peak per segment.
        let ptp_max: Vec<f32> = segments
            .iter()
            .map(|segment| {
                segment
                    .data
                    .iter()
                    .map(|ch| peak_to_peak(ch))
                    .fold(0.0f32, f32::max)
            })
            .collect();
        let ptp_z = robust_z(&ptp_max);

        let env_window = ((self.envelope_window_seconds * sample_rate_hz) as usize).max(1);
        let lf_med: Vec<f32> = segments
            .iter()
            .map(|segment| {
                let mut per_channel: Vec<f32> = segment
                    .data
                    .iter()
                    .map(|ch| envelope_max(ch, env_window))
                    .collect();
                per_channel.sort_by(|a, b| a.total_cmp(b));
                per_channel[per_channel.len() / 2]
            })
            .collect();
        let lf_z = robust_z(&lf_med);

        ptp_z
            .iter()
            .zip(&lf_z)
            .map(|(&p, &l)| p > self.ptp_z_threshold || l > self.envelope_z_threshold)
            .collect()
    }
}

fn segment_std(segment: &Segment) -> f32 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for channel in &segment.data {
        sum += channel.iter().map(|&v| v as f64).sum::<f64>();
        count += channel.len();
    }
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    let var: f64 = segment
        .data
        .iter()
        .flat_map(|ch| ch.iter())
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count as f64;
    var.sqrt() as f32
}

fn peak_to_peak(channel: &[f32]) -> f32 {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in channel {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() {
        max - min
    } else {
        0.0
    }
}

/// Max of the moving average of |x| over `window` samples.
fn envelope_max(channel: &[f32], window: usize) -> f32 {
    if channel.is_empty() {
        return 0.0;
    }
    if window <= 1 || channel.len() <= window {
        return channel.iter().map(|v| v.abs()).sum::<f32>() / channel.len() as f32;
    }
    let mut acc: f32 = channel[..window].iter().map(|v| v.abs()).sum();
    let mut best = acc;
    for i in window..channel.len() {
        acc += channel[i].abs() - channel[i - window].abs();
        best = best.max(acc);
    }
    best / window as f32
}

/// Robust z-score: (x - median) / (1.4826 * MAD).
fn robust_z(values: &[f32]) -> Vec<f32> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = sorted[sorted.len() / 2];
    let mut deviations: Vec<f32> = values.iter().map(|&v| (v - median).abs()).collect();
    deviations.sort_by(|a, b| a.total_cmp(b));
    let mad = deviations[deviations.len() / 2] + 1e-6;
    values
        .iter()
        .map(|&v| (v - median) / (1.4826 * mad))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(values: Vec<f32>) -> Segment {
        Segment {
            start_sample: 0,
            data: vec![values],
        }
    }

    fn oscillating(amp: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| if i % 2 == 0 { amp } else { -amp })
            .collect()
    }

    #[test]
    fn std_ratio_flags_collapsed_segments() {
        let mut segments: Vec<Segment> = (0..10).map(|_| segment(oscillating(1.0, 100))).collect();
        segments.push(segment(vec![0.0; 100]));
        let flags = StdRatioScorer::default().score(&segments, 250.0);
        assert_eq!(flags.len(), 11);
        assert!(flags[10]);
        assert!(flags[..10].iter().all(|&b| !b));
    }

    #[test]
    fn robust_scorer_flags_amplitude_outliers() {
        let mut segments: Vec<Segment> = (0..20).map(|_| segment(oscillating(1.0, 250))).collect();
        segments.push(segment(oscillating(60.0, 250)));
        let flags = RobustAmplitudeScorer::default().score(&segments, 250.0);
        assert!(flags[20]);
        assert!(flags[..20].iter().all(|&b| !b));
    }

    #[test]
    fn uniform_recordings_have_no_bad_segments() {
        let segments: Vec<Segment> = (0..15).map(|_| segment(oscillating(1.0, 250))).collect();
        for scorer in [
            Box::new(StdRatioScorer::default()) as Box<dyn QualityScorer>,
            Box::new(RobustAmplitudeScorer::default()),
        ] {
            let flags = scorer.score(&segments, 250.0);
            assert!(flags.iter().all(|&b| !b));
        }
    }

    #[test]
    fn empty_input_yields_empty_flags() {
        assert!(StdRatioScorer::default().score(&[], 250.0).is_empty());
        assert!(RobustAmplitudeScorer::default().score(&[], 250.0).is_empty());
    }
}
