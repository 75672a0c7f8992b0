//! Second-order IIR sections for band-limiting and notch removal.
//!
//! Butterworth responses come from the RBJ cookbook; filters run as a
//! forward-backward pass so the conditioned signal stays zero-phase.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Normalized biquad coefficients (a0 divided out).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    pub(crate) fn lowpass(sample_rate_hz: f64, cutoff_hz: f64) -> Self {
        let (w0, alpha) = pole(sample_rate_hz, cutoff_hz, FRAC_1_SQRT_2);
        let cosw = w0.cos();
        let b1 = 1.0 - cosw;
        Self::normalized(b1 / 2.0, b1, b1 / 2.0, 1.0 + alpha, -2.0 * cosw, 1.0 - alpha)
    }

    pub(crate) fn highpass(sample_rate_hz: f64, cutoff_hz: f64) -> Self {
        let (w0, alpha) = pole(sample_rate_hz, cutoff_hz, FRAC_1_SQRT_2);
        let cosw = w0.cos();
        let b1 = 1.0 + cosw;
        Self::normalized(
            b1 / 2.0,
            -b1,
            b1 / 2.0,
            1.0 + alpha,
            -2.0 * cosw,
            1.0 - alpha,
        )
    }

    pub(crate) fn notch(sample_rate_hz: f64, center_hz: f64, q: f64) -> Self {
        let (w0, alpha) = pole(sample_rate_hz, center_hz, q);
        let cosw = w0.cos();
        Self::normalized(1.0, -2.0 * cosw, 1.0, 1.0 + alpha, -2.0 * cosw, 1.0 - alpha)
    }

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    fn run(&self, samples: &mut [f32]) {
        let mut x1 = 0.0f64;
        let mut x2 = 0.0f64;
        let mut y1 = 0.0f64;
        let mut y2 = 0.0f64;
        for sample in samples.iter_mut() {
            let x0 = *sample as f64;
            let y0 = self.b0 * x0 + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = y0;
            *sample = y0 as f32;
        }
    }

    /// Forward-backward application; cancels the section's phase response.
    pub(crate) fn filtfilt(&self, samples: &mut [f32]) {
        self.run(samples);
        samples.reverse();
        self.run(samples);
        samples.reverse();
    }
}

fn pole(sample_rate_hz: f64, freq_hz: f64, q: f64) -> (f64, f64) {
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    (w0, w0.sin() / (2.0 * q))
}

/// Band-limits one channel to `[low, high]` Hz in place.
pub(crate) fn bandpass(samples: &mut [f32], sample_rate_hz: f64, low_hz: f64, high_hz: f64) {
    Biquad::highpass(sample_rate_hz, low_hz).filtfilt(samples);
    Biquad::lowpass(sample_rate_hz, high_hz).filtfilt(samples);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine(freq: f32, rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (TAU * freq * i as f32 / rate).sin())
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn bandpass_keeps_passband_and_rejects_stopband() {
        let rate = 250.0;
        let mut in_band = sine(10.0, rate, 2500);
        let mut above_band = sine(70.0, rate, 2500);
        bandpass(&mut in_band, rate as f64, 1.0, 40.0);
        bandpass(&mut above_band, rate as f64, 1.0, 40.0);
        // Interior only: the forward-backward pass has edge transients.
        assert!(rms(&in_band[500..2000]) > 0.6);
        assert!(rms(&above_band[500..2000]) < 0.15);
    }

    #[test]
    fn notch_attenuates_center_frequency() {
        let rate = 250.0;
        let mut mains = sine(50.0, rate, 2500);
        let mut neighbor = sine(30.0, rate, 2500);
        let notch = Biquad::notch(rate as f64, 50.0, 30.0);
        notch.filtfilt(&mut mains);
        notch.filtfilt(&mut neighbor);
        assert!(rms(&mains[500..2000]) < 0.1);
        assert!(rms(&neighbor[500..2000]) > 0.6);
    }
}
