//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of the classification
//! pipeline. The defaults reproduce the reference deployment settings.

use std::path::PathBuf;

/// Configuration for the EEG classification pipeline.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use ictal::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     threshold: 2.5,    // stricter seizure-power threshold
///     ..PipelineConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the serialized model weights (safetensors).
    ///
    /// The loader accepts flat parameter names or names nested under a
    /// `model_state_dict.` / `state_dict.` prefix. When the file is missing
    /// or incompatible the pipeline falls back to an untrained model and
    /// records [`crate::PipelineWarning::UntrainedModel`].
    ///
    /// Default: `models/gnn.safetensors`.
    pub model_path: PathBuf,

    /// Seizure-detection threshold in standard deviations over the
    /// z-normalized mean power trace.
    ///
    /// Default: `2.0`.
    pub threshold: f32,

    /// Whether to fabricate a placeholder interval (at one quarter of the
    /// recording, lasting 15 s) when no above-threshold span is found.
    ///
    /// The reference behavior always surfaces an interval to the report
    /// stage; disabling this returns an empty list instead. Either way a
    /// fabricated interval is marked with
    /// [`crate::PipelineWarning::FabricatedInterval`].
    ///
    /// Default: `true`.
    pub fabricate_placeholder: bool,

    /// RNG seed for the synthetic fallback recording and untrained-model
    /// initialization. `None` seeds from the OS.
    ///
    /// Default: `None`.
    pub synthetic_seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/gnn.safetensors"),
            threshold: 2.0,
            fabricate_placeholder: true,
            synthetic_seed: None,
        }
    }
}
