//! Per-channel feature extraction.
//!
//! Each channel yields 11 values in fixed order: mean, std, max, min,
//! kurtosis, skewness, then the five EEG band powers (delta through gamma).
//! Statistics accumulate in f64; kurtosis and skewness are the fourth/third
//! standardized central moments and are defined as 0 for a zero-variance
//! channel. A failed spectral estimate zeroes that channel's band powers and
//! the batch continues.
use log::warn;

use crate::diagnostics::PipelineWarning;
use crate::recording::RawRecording;
use crate::spectral;

/// EEG band edges in Hz, half-open `[lo, hi)`.
pub const BANDS: [(f64, f64); 5] = [
    (0.5, 4.0),  // delta
    (4.0, 8.0),  // theta
    (8.0, 13.0), // alpha
    (13.0, 30.0), // beta
    (30.0, 45.0), // gamma
];

/// Number of features per channel.
pub const FEATURE_DIM: usize = 11;

/// The fixed-order feature vector of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFeatures {
    pub mean: f32,
    pub std: f32,
    pub max: f32,
    pub min: f32,
    pub kurtosis: f32,
    pub skewness: f32,
    pub delta: f32,
    pub theta: f32,
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

impl ChannelFeatures {
    /// The vector in its canonical order.
    pub fn as_array(&self) -> [f32; FEATURE_DIM] {
        [
            self.mean,
            self.std,
            self.max,
            self.min,
            self.kurtosis,
            self.skewness,
            self.delta,
            self.theta,
            self.alpha,
            self.beta,
            self.gamma,
        ]
    }
}

/// Extract one [`ChannelFeatures`] per channel, in channel order.
///
/// Degenerate spectral estimates are absorbed per channel and appended to
/// `warnings`; they never abort the batch.
pub fn extract(rec: &RawRecording, warnings: &mut Vec<PipelineWarning>) -> Vec<ChannelFeatures> {
    let fs = rec.sampling_rate as f64;
    (0..rec.n_channels())
        .map(|ch| {
            let row = rec.samples.row(ch);
            let channel: Vec<f32> = row.to_vec();
            let mut f = time_domain(&channel);

            match spectral::welch(&channel, fs) {
                Ok(psd) => {
                    let powers: Vec<f32> =
                        BANDS.iter().map(|&(lo, hi)| psd.band_power(lo, hi) as f32).collect();
                    f.delta = powers[0];
                    f.theta = powers[1];
                    f.alpha = powers[2];
                    f.beta = powers[3];
                    f.gamma = powers[4];
                }
                Err(e) => {
                    warn!("spectral estimate failed on channel {ch}: {e}");
                    warnings.push(PipelineWarning::DegenerateChannel { channel: ch });
                }
            }
            f
        })
        .collect()
}

/// Time-domain statistics; band powers start at zero.
fn time_domain(x: &[f32]) -> ChannelFeatures {
    let n = x.len() as f64;
    let mean = x.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut m2 = 0.0_f64;
    let mut m3 = 0.0_f64;
    let mut m4 = 0.0_f64;
    for &v in x {
        let d = v as f64 - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;

    let std = m2.sqrt();
    // Guard the standardized moments against zero variance.
    let (kurtosis, skewness) = if std > 0.0 {
        (m4 / (std * std * std * std), m3 / (std * std * std))
    } else {
        (0.0, 0.0)
    };

    let max = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min = x.iter().copied().fold(f32::INFINITY, f32::min);

    ChannelFeatures {
        mean: mean as f32,
        std: std as f32,
        max,
        min,
        kurtosis: kurtosis as f32,
        skewness: skewness as f32,
        delta: 0.0,
        theta: 0.0,
        alpha: 0.0,
        beta: 0.0,
        gamma: 0.0,
    }
}
