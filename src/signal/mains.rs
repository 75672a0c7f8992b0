//! Power-line interference detection.
//!
//! Estimates a Welch power spectrum over the 45-65 Hz band and compares
//! narrow-band energy around the two mains candidates against a
//! neighboring baseline. Detection only ever answers "50", "60", or
//! "ambiguous" - an ambiguous spectrum means no notch is applied.

use rustfft::{num_complex::Complex32, FftPlanner};

const MAX_FFT_SIZE: usize = 4096;
const MIN_FFT_SIZE: usize = 256;
const WELCH_HOP: usize = 3072;
const CANDIDATE_BAND_HZ: f64 = 1.5;
const BASELINE_LOW_HZ: f64 = 46.0;
const BASELINE_HIGH_HZ: f64 = 64.0;
const RATIO_THRESHOLD: f64 = 3.0;

/// Detects the dominant mains frequency, if any. `None` means the
/// spectrum is ambiguous or too short to judge; callers must then skip
/// notching rather than guess.
pub(crate) fn detect_mains_hz(channels: &[Vec<f32>], sample_rate_hz: f64) -> Option<u32> {
    // Both candidate bands have to sit below Nyquist.
    if sample_rate_hz < 140.0 {
        return None;
    }
    let samples = channels.first().map_or(0, Vec::len);
    let fft_size = fft_size_for(samples)?;

    let mut per_channel: Vec<Vec<f64>> = Vec::with_capacity(channels.len());
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let hann: Vec<f32> = (0..fft_size)
        .map(|i| {
            let phase = std::f32::consts::TAU * i as f32 / fft_size as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect();

    for channel in channels {
        if channel.len() < fft_size {
            continue;
        }
        let mut acc = vec![0.0f64; fft_size / 2];
        let mut windows = 0usize;
        let mut start = 0usize;
        while start + fft_size <= channel.len() {
            let mut buffer: Vec<Complex32> = channel[start..start + fft_size]
                .iter()
                .zip(&hann)
                .map(|(&v, &w)| Complex32::new(v * w, 0.0))
                .collect();
            fft.process(&mut buffer);
            for (slot, value) in acc.iter_mut().zip(buffer.iter().take(fft_size / 2)) {
                *slot += value.norm_sqr() as f64;
            }
            windows += 1;
            start += WELCH_HOP;
        }
        if windows > 0 {
            for slot in &mut acc {
                *slot /= windows as f64;
            }
            per_channel.push(acc);
        }
    }
    if per_channel.is_empty() {
        return None;
    }

    // Median across channels per bin, robust to one noisy electrode.
    let bins = fft_size / 2;
    let mut psd = vec![0.0f64; bins];
    let mut column = Vec::with_capacity(per_channel.len());
    for (bin, slot) in psd.iter_mut().enumerate() {
        column.clear();
        column.extend(per_channel.iter().map(|ch| ch[bin]));
        *slot = median(&mut column);
    }

    // A hum line occupies only a few bins, so the candidate bands are
    // scored by their mean; the baseline uses the median as a noise-floor
    // estimate that the line itself cannot drag up.
    let hz_per_bin = sample_rate_hz / fft_size as f64;
    let band_power = |center: f64| -> f64 {
        band_mean(
            &psd,
            hz_per_bin,
            center - CANDIDATE_BAND_HZ,
            center + CANDIDATE_BAND_HZ,
        )
    };
    let baseline = band_median(&psd, hz_per_bin, BASELINE_LOW_HZ, BASELINE_HIGH_HZ);
    let r50 = band_power(50.0) / (baseline + 1e-9);
    let r60 = band_power(60.0) / (baseline + 1e-9);

    if r50 >= RATIO_THRESHOLD && r50 >= r60 {
        Some(50)
    } else if r60 >= RATIO_THRESHOLD && r60 > r50 {
        Some(60)
    } else {
        None
    }
}

fn fft_size_for(samples: usize) -> Option<usize> {
    if samples < MIN_FFT_SIZE {
        return None;
    }
    let mut size = MAX_FFT_SIZE;
    while size > samples {
        size /= 2;
    }
    Some(size)
}

fn band_mean(psd: &[f64], hz_per_bin: f64, low_hz: f64, high_hz: f64) -> f64 {
    let band: Vec<f64> = band_bins(psd, hz_per_bin, low_hz, high_hz);
    if band.is_empty() {
        0.0
    } else {
        band.iter().sum::<f64>() / band.len() as f64
    }
}

fn band_median(psd: &[f64], hz_per_bin: f64, low_hz: f64, high_hz: f64) -> f64 {
    let mut band = band_bins(psd, hz_per_bin, low_hz, high_hz);
    if band.is_empty() {
        0.0
    } else {
        median(&mut band)
    }
}

fn band_bins(psd: &[f64], hz_per_bin: f64, low_hz: f64, high_hz: f64) -> Vec<f64> {
    psd.iter()
        .enumerate()
        .filter(|(bin, _)| {
            let hz = *bin as f64 * hz_per_bin;
            hz >= low_hz && hz <= high_hz
        })
        .map(|(_, &p)| p)
        .collect()
}

fn median(values: &mut Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn tone(freq: f32, rate: f32, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amp * (TAU * freq * i as f32 / rate).sin())
            .collect()
    }

    fn broadband(rate: f32, n: usize, seed: u64) -> Vec<f32> {
        // Deterministic noise-plus-rhythm stand-in for background EEG.
        let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((state >> 33) as f32 / (1u64 << 31) as f32) - 1.0;
            let alpha = 0.3 * (TAU * 10.0 * i as f32 / rate).sin();
            out.push(0.5 * noise + alpha);
        }
        out
    }

    #[test]
    fn strong_fifty_hz_is_detected() {
        let rate = 250.0;
        let n = 30_000;
        let channels: Vec<Vec<f32>> = (0..4)
            .map(|seed| {
                let mut ch = broadband(rate, n, seed as u64 + 1);
                let hum = tone(50.0, rate, n, 3.0);
                for (s, h) in ch.iter_mut().zip(hum) {
                    *s += h;
                }
                ch
            })
            .collect();
        assert_eq!(detect_mains_hz(&channels, rate as f64), Some(50));
    }

    #[test]
    fn clean_signal_stays_ambiguous() {
        let rate = 250.0;
        let channels: Vec<Vec<f32>> = (0..4)
            .map(|seed| broadband(rate, 30_000, seed as u64 + 1))
            .collect();
        assert_eq!(detect_mains_hz(&channels, rate as f64), None);
    }

    #[test]
    fn short_or_slow_recordings_skip_detection() {
        let channels = vec![vec![0.0f32; 100]];
        assert_eq!(detect_mains_hz(&channels, 250.0), None);
        let channels = vec![vec![0.0f32; 10_000]];
        assert_eq!(detect_mains_hz(&channels, 128.0), None);
    }
}
