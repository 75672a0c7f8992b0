//! Turns resolved per-channel series at their native rate into the fixed
//! representation the classifier was trained on: notched when mains hum is
//! unambiguous, band-limited, resampled to the target rate, and re-referenced
//! to the common average.

use crate::config::EegConfig;
use crate::signal::filters::{bandpass, Biquad};
use crate::signal::mains::detect_mains_hz;
use crate::types::RawSignal;

const NOTCH_Q: f64 = 30.0;
const RATE_TOLERANCE_HZ: f64 = 1e-3;

/// Conditions `channels` (canonical profile order, zero-filled entries
/// allowed) into a [`RawSignal`] at the configured target rate.
///
/// Channel-count shortfalls never fail here; only the channel resolver may
/// reject a recording. Zero-filled channels pass through every stage and
/// stay zero apart from the common-average term.
pub fn condition(
    mut channels: Vec<Vec<f32>>,
    native_rate_hz: f64,
    config: &EegConfig,
) -> RawSignal {
    if let Some(mains) = detect_mains_hz(&channels, native_rate_hz) {
        tracing::debug!(mains_hz = mains, "notching detected power-line interference");
        let mut centers = vec![mains as f64];
        let harmonic = (mains * 2) as f64;
        if harmonic < native_rate_hz / 2.0 {
            centers.push(harmonic);
        }
        for center in centers {
            let notch = Biquad::notch(native_rate_hz, center, NOTCH_Q);
            for channel in &mut channels {
                notch.filtfilt(channel);
            }
        }
    }

    for channel in &mut channels {
        bandpass(
            channel,
            native_rate_hz,
            config.band_low_hz,
            config.band_high_hz,
        );
    }

    let data = if (native_rate_hz - config.target_rate_hz).abs() > RATE_TOLERANCE_HZ {
        tracing::debug!(
            native_rate_hz,
            target_rate_hz = config.target_rate_hz,
            "resampling to target rate"
        );
        channels
            .into_iter()
            .map(|ch| resample_linear(&ch, native_rate_hz, config.target_rate_hz))
            .collect()
    } else {
        channels
    };

    let data = common_average_reference(data);

    RawSignal {
        data,
        sample_rate_hz: config.target_rate_hz,
    }
}

/// Linear-interpolation resampler. Band-limiting runs first, so the
/// passband content is well below either Nyquist rate.
fn resample_linear(samples: &[f32], from_hz: f64, to_hz: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let out_len = ((samples.len() as f64) * to_hz / from_hz).round().max(1.0) as usize;
    let step = from_hz / to_hz;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * step;
        let base = pos.floor() as usize;
        if base + 1 >= samples.len() {
            out.push(*samples.last().expect("non-empty"));
        } else {
            let frac = (pos - base as f64) as f32;
            out.push(samples[base] * (1.0 - frac) + samples[base + 1] * frac);
        }
    }
    out
}

/// Re-expresses each channel relative to the instantaneous cross-channel
/// mean. Skipped for fewer than two channels.
fn common_average_reference(mut data: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
    if data.len() < 2 {
        return data;
    }
    let samples = data.iter().map(Vec::len).min().unwrap_or(0);
    for t in 0..samples {
        let mean: f32 = data.iter().map(|ch| ch[t]).sum::<f32>() / data.len() as f32;
        for channel in &mut data {
            channel[t] -= mean;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn resample_preserves_duration() {
        let rate = 256.0;
        let samples: Vec<f32> = (0..2560)
            .map(|i| (TAU * 5.0 * i as f32 / rate as f32).sin())
            .collect();
        let out = resample_linear(&samples, rate, 250.0);
        assert_eq!(out.len(), 2500);
    }

    #[test]
    fn matching_rate_skips_resampling() {
        let config = EegConfig::default();
        let channels = vec![vec![1.0f32; 2500], vec![-1.0f32; 2500]];
        let signal = condition(channels, 250.0, &config);
        assert_eq!(signal.sample_count(), 2500);
        assert_eq!(signal.sample_rate_hz, 250.0);
    }

    #[test]
    fn common_average_reference_zeroes_cross_channel_mean() {
        let data = vec![vec![2.0f32; 100], vec![0.0f32; 100], vec![1.0f32; 100]];
        let reref = common_average_reference(data);
        for t in 0..100 {
            let mean: f32 = reref.iter().map(|ch| ch[t]).sum::<f32>() / 3.0;
            assert!(mean.abs() < 1e-6);
        }
    }

    #[test]
    fn single_channel_skips_re_reference() {
        let data = vec![vec![5.0f32; 10]];
        let reref = common_average_reference(data);
        assert_eq!(reref[0], vec![5.0f32; 10]);
    }
}
