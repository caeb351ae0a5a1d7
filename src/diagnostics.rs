//! Non-fatal pipeline diagnostics.
//!
//! The pipeline never fails outright: unreadable input, missing weights, and
//! degenerate numerics are all absorbed with substitutes. Each absorption is
//! recorded as a [`PipelineWarning`] on the result so callers can detect a
//! degraded run without parsing logs.
use serde::Serialize;

/// One absorbed-fallback event from a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Input could not be read; a synthetic recording was substituted.
    #[error("input unreadable, substituted synthetic recording")]
    SyntheticInput,

    /// Weight file missing or incompatible; an untrained model was used.
    #[error("model weights unavailable, using untrained model")]
    UntrainedModel,

    /// A channel's spectral estimate failed; its band powers were zeroed.
    #[error("degenerate spectral estimate on channel {channel}")]
    DegenerateChannel { channel: usize },

    /// Classification failed; the fixed fallback confidence was returned.
    #[error("classification failed, returned fixed fallback confidence")]
    FixedConfidenceFallback,

    /// No above-threshold span was found; the placeholder interval was
    /// fabricated at one quarter of the recording duration.
    #[error("no seizure span detected, fabricated placeholder interval")]
    FabricatedInterval,

    /// Interval detection failed; the fixed 00:30-00:45 interval was returned.
    #[error("interval detection failed, returned fixed fallback interval")]
    FallbackInterval,
}
