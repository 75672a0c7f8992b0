//! Overlapping-window segmentation and per-record normalization.

use crate::types::{RawSignal, Segment};

/// Slices the conditioned signal into the maximal ordered sequence of
/// `window` slices starting every `hop` samples. A recording shorter than
/// one window yields no segments; nothing is ever padded or truncated.
pub fn segment_signal(signal: &RawSignal, window: usize, hop: usize) -> Vec<Segment> {
    let total = signal.sample_count();
    if window == 0 || total < window {
        return Vec::new();
    }
    let hop = hop.max(1);
    let mut segments = Vec::with_capacity((total - window) / hop + 1);
    let mut start = 0usize;
    while start + window <= total {
        let data = signal
            .data
            .iter()
            .map(|ch| ch[start..start + window].to_vec())
            .collect();
        segments.push(Segment {
            start_sample: start,
            data,
        });
        start += hop;
    }
    segments
}

/// Z-scores every segment with per-channel mean/std computed across the
/// whole segment stack, matching the normalization the checkpoints were
/// trained with. Statistics come from the full recording even when only a
/// sub-window is classified later.
pub fn per_record_zscore(segments: &[Segment]) -> Vec<Segment> {
    let Some(first) = segments.first() else {
        return Vec::new();
    };
    let channel_count = first.data.len();

    let mut mean = vec![0.0f64; channel_count];
    let mut count = vec![0usize; channel_count];
    for segment in segments {
        for (c, channel) in segment.data.iter().enumerate() {
            mean[c] += channel.iter().map(|&v| v as f64).sum::<f64>();
            count[c] += channel.len();
        }
    }
    for (m, &n) in mean.iter_mut().zip(&count) {
        *m /= n.max(1) as f64;
    }

    let mut var = vec![0.0f64; channel_count];
    for segment in segments {
        for (c, channel) in segment.data.iter().enumerate() {
            var[c] += channel
                .iter()
                .map(|&v| {
                    let d = v as f64 - mean[c];
                    d * d
                })
                .sum::<f64>();
        }
    }
    let std: Vec<f64> = var
        .iter()
        .zip(&count)
        .map(|(&v, &n)| (v / n.max(1) as f64).sqrt() + 1e-7)
        .collect();

    segments
        .iter()
        .map(|segment| Segment {
            start_sample: segment.start_sample,
            data: segment
                .data
                .iter()
                .enumerate()
                .map(|(c, channel)| {
                    channel
                        .iter()
                        .map(|&v| ((v as f64 - mean[c]) / std[c]) as f32)
                        .collect()
                })
                .collect(),
        })
        .collect()
}
