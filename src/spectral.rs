//! Welch power-spectral-density estimation.
//!
//! Matches `scipy.signal.welch` defaults: periodic Hann window, 50 % overlap,
//! per-segment constant detrend, one-sided density scaling
//! (`|X|² / (fs · Σw²)`, interior bins doubled), mean across segments.
use anyhow::{bail, Result};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Maximum Welch segment length; shorter signals use their full length.
pub const MAX_SEGMENT: usize = 256;

/// One-sided PSD estimate with its frequency grid.
#[derive(Debug, Clone)]
pub struct Psd {
    /// Bin frequencies in Hz, `freqs[k] = k · fs / nperseg`.
    pub freqs: Vec<f64>,
    /// Power spectral density per bin (unit²/Hz).
    pub values: Vec<f64>,
}

impl Psd {
    /// Sum of PSD values whose bin frequency lies in the half-open band
    /// `[lo, hi)`.
    pub fn band_power(&self, lo: f64, hi: f64) -> f64 {
        self.freqs
            .iter()
            .zip(self.values.iter())
            .filter(|(&f, _)| f >= lo && f < hi)
            .map(|(_, &p)| p)
            .sum()
    }
}

/// Estimate the PSD of a single channel with Welch's method.
///
/// `nperseg` is `min(MAX_SEGMENT, x.len())`. Fails on an empty signal or a
/// degenerate segment length; callers treat that as a local, per-channel
/// condition and zero the affected band powers.
pub fn welch(x: &[f32], fs: f64) -> Result<Psd> {
    if x.is_empty() {
        bail!("cannot estimate PSD of an empty signal");
    }
    if !(fs > 0.0) {
        bail!("invalid sampling rate {fs}");
    }
    let nperseg = MAX_SEGMENT.min(x.len());
    if nperseg < 2 {
        bail!("segment length {nperseg} too short for spectral estimation");
    }

    let noverlap = nperseg / 2;
    let step = nperseg - noverlap;
    let win = hann_periodic(nperseg);
    let win_sumsq: f64 = win.iter().map(|&w| w * w).sum();

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(nperseg);

    let n_bins = nperseg / 2 + 1;
    let mut acc = vec![0.0_f64; n_bins];
    let mut n_segments = 0usize;

    let mut start = 0;
    while start + nperseg <= x.len() {
        let seg = &x[start..start + nperseg];

        // Constant detrend, then window.
        let mean = seg.iter().map(|&v| v as f64).sum::<f64>() / nperseg as f64;
        let mut buf: Vec<Complex<f64>> = seg
            .iter()
            .zip(win.iter())
            .map(|(&v, &w)| Complex {
                re: (v as f64 - mean) * w,
                im: 0.0,
            })
            .collect();

        fft.process(&mut buf);

        let scale = 1.0 / (fs * win_sumsq);
        for (k, slot) in acc.iter_mut().enumerate() {
            let mut p = buf[k].norm_sqr() * scale;
            // One-sided: double everything except DC and (for even nperseg)
            // the Nyquist bin.
            if k != 0 && !(nperseg % 2 == 0 && k == n_bins - 1) {
                p *= 2.0;
            }
            *slot += p;
        }

        n_segments += 1;
        start += step;
    }

    if n_segments == 0 {
        bail!("signal shorter than one Welch segment");
    }

    let inv = 1.0 / n_segments as f64;
    let values: Vec<f64> = acc.into_iter().map(|v| v * inv).collect();
    let freqs: Vec<f64> = (0..n_bins).map(|k| k as f64 * fs / nperseg as f64).collect();

    Ok(Psd { freqs, values })
}

/// Periodic Hann window (`fftbins=True` in scipy terms).
fn hann_periodic(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos()))
        .collect()
}
