//! # ictal — EEG seizure classification in pure Rust
//!
//! `ictal` turns a raw multichannel EEG recording into a diagnostic
//! classification: it builds a channel graph from per-channel statistical
//! and spectral features, scores it with a fixed-topology graph neural
//! network, and, for epileptic findings, scans the raw signal for seizure
//! intervals.
//!
//! ## Pipeline overview
//!
//! ```text
//! recording.edf
//!   │
//!   ├─ ingest::load_recording()   native EDF reader, synthetic fallback
//!   ├─ features::extract()        11 per-channel stats + band powers
//!   ├─ graph::build()             complete directed channel graph
//!   ├─ GnnModel::forward()        5 conv blocks + 2 dense, log-softmax
//!   ├─ gnn::aggregate()           per-node probabilities → graph mean
//!   └─ detect::seizure_intervals  (epileptic only) power thresholding
//!        │
//!        └─→ Analysis { label, confidence, intervals, diagnostics }
//! ```
//!
//! The pipeline never fails: unreadable input, missing model weights, and
//! degenerate numerics are absorbed with substitutes, and every absorbed
//! fallback is reported as a [`PipelineWarning`] on the returned
//! [`Analysis`].
//!
//! ## Quick start
//!
//! ```no_run
//! use ictal::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let analysis = pipeline.analyze("data/patient01.edf".as_ref());
//!
//! println!("{} ({:.1}%)",
//!     analysis.classification.label,
//!     analysis.classification.confidence.get(analysis.classification.label));
//! for w in &analysis.diagnostics {
//!     eprintln!("warning: {w}");
//! }
//! ```

pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod edf;
pub mod features;
pub mod gnn;
pub mod graph;
pub mod ingest;
pub mod recording;
pub mod result;
pub mod spectral;

use std::path::Path;

use anyhow::{bail, Result};
use log::{error, info};
use once_cell::sync::OnceCell;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `ictal::Foo` without having to know the internal module layout.

pub use config::PipelineConfig;
pub use diagnostics::PipelineWarning;
pub use features::{ChannelFeatures, FEATURE_DIM};
pub use gnn::{aggregate, architecture, GnnModel, LayerSpec};
pub use graph::ChannelGraph;
pub use recording::RawRecording;
pub use result::{Analysis, ClassLabel, Classification, Confidence, SeizureInterval};

/// Seed for the untrained-model fallback when the config provides none.
const UNTRAINED_INIT_SEED: u64 = 0x5EED;

/// The classification pipeline.
///
/// Owns the configuration and the lazily loaded model handle. The model is
/// loaded at most once per `Pipeline` value, on first use, and shared
/// read-only afterwards; inference never mutates it, so one `Pipeline` can
/// serve concurrent callers behind a shared reference.
pub struct Pipeline {
    config: PipelineConfig,
    model: OnceCell<GnnModel>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    /// Build a pipeline with an already-constructed model, bypassing the
    /// weight file entirely. Useful for tests and for callers managing the
    /// model lifecycle themselves.
    pub fn with_model(config: PipelineConfig, model: GnnModel) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(model);
        Self { config, model: cell }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze a recording file.
    ///
    /// Unreadable input is replaced by the synthetic fallback recording;
    /// see [`Analysis::diagnostics`] for every substitution made.
    pub fn analyze(&self, path: &Path) -> Analysis {
        let mut warnings = Vec::new();
        let rec = ingest::load_recording(path, &self.config, &mut warnings);
        self.run(&rec, warnings)
    }

    /// Analyze an already-loaded recording.
    pub fn classify_recording(&self, rec: &RawRecording) -> Analysis {
        let mut warnings = Vec::new();
        if rec.synthetic {
            warnings.push(PipelineWarning::SyntheticInput);
        }
        self.run(rec, warnings)
    }

    fn run(&self, rec: &RawRecording, mut warnings: Vec<PipelineWarning>) -> Analysis {
        let classification = match self.classify(rec, &mut warnings) {
            Ok(c) => c,
            Err(e) => {
                error!("classification failed: {e:#}; returning fixed fallback result");
                warnings.push(PipelineWarning::FixedConfidenceFallback);
                Classification {
                    label: ClassLabel::NonEpileptic,
                    confidence: Confidence::from_probabilities([0.10, 0.80, 0.10]),
                    seizure_intervals: Vec::new(),
                }
            }
        };
        Analysis {
            classification,
            diagnostics: warnings,
        }
    }

    fn classify(
        &self,
        rec: &RawRecording,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Result<Classification> {
        let features = features::extract(rec, warnings);
        if features.is_empty() {
            bail!("recording has no channels");
        }
        let graph = graph::build(&features);

        let model = self.model(warnings);
        let log_probs = model.forward(&graph)?;
        let probs = gnn::aggregate(&log_probs);

        let winner = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(ClassLabel::NonEpileptic.index());
        let label = match ClassLabel::from_index(winner) {
            Some(l) => l,
            None => bail!("class index {winner} out of range"),
        };
        let confidence = Confidence::from_probabilities(probs);

        // Interval detection runs on the raw signal, independently of the
        // graph, and only for epileptic findings.
        let seizure_intervals = if label == ClassLabel::Epileptic {
            detect::seizure_intervals(rec, &self.config, warnings)
        } else {
            Vec::new()
        };

        info!(
            "classified as {label} (epileptic {:.1}%, non-epileptic {:.1}%, psychogenic {:.1}%)",
            confidence.epileptic, confidence.non_epileptic, confidence.psychogenic
        );

        Ok(Classification {
            label,
            confidence,
            seizure_intervals,
        })
    }

    /// The lazily loaded model handle. Records a
    /// [`PipelineWarning::UntrainedModel`] diagnostic whenever the handle in
    /// use is the untrained fallback.
    fn model(&self, warnings: &mut Vec<PipelineWarning>) -> &GnnModel {
        let model = self.model.get_or_init(|| {
            let seed = self.config.synthetic_seed.unwrap_or(UNTRAINED_INIT_SEED);
            GnnModel::load_or_untrained(&self.config.model_path, seed).0
        });
        if model.is_untrained() {
            warnings.push(PipelineWarning::UntrainedModel);
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline_with_untrained_model() -> Pipeline {
        let cfg = PipelineConfig {
            synthetic_seed: Some(1),
            ..PipelineConfig::default()
        };
        Pipeline::with_model(cfg, GnnModel::untrained(1))
    }

    #[test]
    fn synthetic_recording_classifies_cleanly() {
        let p = pipeline_with_untrained_model();
        let rec = ingest::synthetic_recording(Some(5));
        let analysis = p.classify_recording(&rec);

        assert!(ClassLabel::ALL.contains(&analysis.classification.label));
        approx::assert_abs_diff_eq!(
            analysis.classification.confidence.total(),
            100.0,
            epsilon = 0.1
        );
        // Synthetic input must be flagged.
        assert!(analysis
            .diagnostics
            .contains(&PipelineWarning::SyntheticInput));
    }

    #[test]
    fn non_epileptic_label_has_no_intervals() {
        let p = pipeline_with_untrained_model();
        let rec = ingest::synthetic_recording(Some(5));
        let analysis = p.classify_recording(&rec);
        if analysis.classification.label != ClassLabel::Epileptic {
            assert!(analysis.classification.seizure_intervals.is_empty());
        } else {
            assert!(!analysis.classification.seizure_intervals.is_empty());
        }
    }

    #[test]
    fn missing_weight_file_flags_untrained_model() {
        let cfg = PipelineConfig {
            model_path: "/nonexistent/weights.safetensors".into(),
            synthetic_seed: Some(2),
            ..PipelineConfig::default()
        };
        let p = Pipeline::new(cfg);
        let rec = ingest::synthetic_recording(Some(2));
        let analysis = p.classify_recording(&rec);
        assert!(analysis
            .diagnostics
            .contains(&PipelineWarning::UntrainedModel));
    }

    #[test]
    fn analyze_absorbs_unreadable_path() {
        let p = pipeline_with_untrained_model();
        let analysis = p.analyze(Path::new("/definitely/not/here.edf"));
        assert!(analysis
            .diagnostics
            .contains(&PipelineWarning::SyntheticInput));
        assert!(ClassLabel::ALL.contains(&analysis.classification.label));
    }
}
