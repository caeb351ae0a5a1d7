//! Recording ingestion with a synthetic fallback.
//!
//! `load_recording` never fails: any read error is logged and replaced with
//! a generated 22-channel recording so downstream stages always receive
//! well-formed input. Substituted recordings carry `synthetic: true` and a
//! [`PipelineWarning::SyntheticInput`] diagnostic.
use std::f64::consts::PI;
use std::path::Path;

use log::{info, warn};
use ndarray::Array2;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use crate::config::PipelineConfig;
use crate::diagnostics::PipelineWarning;
use crate::edf;
use crate::recording::RawRecording;

/// Synthetic fallback shape: 22 channels, 250 Hz, 20 s.
pub const SYNTH_CHANNELS: usize = 22;
pub const SYNTH_RATE: f32 = 250.0;
pub const SYNTH_DURATION: f32 = 20.0;

/// Base oscillation frequencies (Hz) mixed into every synthetic channel,
/// approximating alpha/beta/theta band activity.
const SYNTH_FREQS: [f64; 4] = [10.0, 20.0, 5.0, 15.0];
const SYNTH_AMPLITUDE: f64 = 0.5;
const SYNTH_NOISE_STD: f64 = 0.2;

/// Accepted upload extensions (case-insensitive).
///
/// Compressed uploads currently route through the synthetic fallback like
/// any other unreadable input.
pub fn is_supported_extension(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("edf" | "bdf" | "zip" | "gz")
    )
}

/// Load an EEG recording, substituting synthetic data on any failure.
pub fn load_recording(
    path: &Path,
    cfg: &PipelineConfig,
    warnings: &mut Vec<PipelineWarning>,
) -> RawRecording {
    match read_edf(path) {
        Ok(rec) => {
            info!(
                "loaded {}: {} ch × {} samples @ {} Hz",
                path.display(),
                rec.n_channels(),
                rec.n_samples(),
                rec.sampling_rate
            );
            rec
        }
        Err(e) => {
            warn!(
                "failed to read {}: {e:#}; substituting synthetic recording",
                path.display()
            );
            warnings.push(PipelineWarning::SyntheticInput);
            synthetic_recording(cfg.synthetic_seed)
        }
    }
}

fn read_edf(path: &Path) -> anyhow::Result<RawRecording> {
    let edf = edf::open(path)?;
    let sampling_rate = edf.sampling_rate()? as f32;
    let channel_names = edf.channel_names();
    let samples = edf.read_all_data()?;
    Ok(RawRecording::new(channel_names, sampling_rate, samples))
}

/// Generate the synthetic fallback recording.
///
/// Each channel mixes the base sinusoids, each scaled by an independent
/// Uniform(0.5, 1.5) factor, plus Normal(0, 0.2) noise. A fixed `seed`
/// makes the output deterministic.
pub fn synthetic_recording(seed: Option<u64>) -> RawRecording {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let n_samples = (SYNTH_DURATION * SYNTH_RATE) as usize;
    let dt = 1.0 / SYNTH_RATE as f64;

    // Shared base oscillations, one per frequency.
    let bases: Vec<Vec<f64>> = SYNTH_FREQS
        .iter()
        .map(|&f| {
            (0..n_samples)
                .map(|i| (2.0 * PI * f * i as f64 * dt).sin() * SYNTH_AMPLITUDE)
                .collect()
        })
        .collect();

    let gain = Uniform::new(0.5, 1.5);
    let noise = Normal::new(0.0, SYNTH_NOISE_STD).expect("valid noise sigma");

    let mut samples = Array2::<f32>::zeros((SYNTH_CHANNELS, n_samples));
    for ch in 0..SYNTH_CHANNELS {
        let gains: Vec<f64> = bases.iter().map(|_| rng.sample(gain)).collect();
        for t in 0..n_samples {
            let mut v = 0.0_f64;
            for (base, g) in bases.iter().zip(gains.iter()) {
                v += base[t] * g;
            }
            v += rng.sample(noise);
            samples[[ch, t]] = v as f32;
        }
    }

    let mut rec = RawRecording::new(
        (0..SYNTH_CHANNELS).map(|i| format!("EEG{}", i + 1)).collect(),
        SYNTH_RATE,
        samples,
    );
    rec.synthetic = true;
    rec
}
