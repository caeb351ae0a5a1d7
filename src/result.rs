//! Classification output types.
//!
//! [`Classification`] serializes to the persistence-layer document shape:
//! `result` (label string), `confidence` (label → percentage), and
//! `seizure_intervals` (array of `[start, end]` pairs).
use serde::Serialize;

use crate::diagnostics::PipelineWarning;

/// The three diagnostic classes, with fixed model output indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassLabel {
    #[serde(rename = "epileptic")]
    Epileptic,
    #[serde(rename = "non-epileptic")]
    NonEpileptic,
    #[serde(rename = "psychogenic")]
    Psychogenic,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 3] = [
        ClassLabel::Epileptic,
        ClassLabel::NonEpileptic,
        ClassLabel::Psychogenic,
    ];

    /// Model output index: 0 epileptic, 1 non-epileptic, 2 psychogenic.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            ClassLabel::Epileptic => 0,
            ClassLabel::NonEpileptic => 1,
            ClassLabel::Psychogenic => 2,
        }
    }

    #[inline]
    pub fn from_index(idx: usize) -> Option<ClassLabel> {
        Self::ALL.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassLabel::Epileptic => "epileptic",
            ClassLabel::NonEpileptic => "non-epileptic",
            ClassLabel::Psychogenic => "psychogenic",
        }
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-class confidence percentages in `[0, 100]`.
///
/// All three values come from one probability distribution scaled by 100,
/// so they sum to ≈ 100 up to rounding.
#[derive(Debug, Clone, Serialize)]
pub struct Confidence {
    pub epileptic: f32,
    #[serde(rename = "non-epileptic")]
    pub non_epileptic: f32,
    pub psychogenic: f32,
}

impl Confidence {
    /// Scale a probability distribution (indexed per [`ClassLabel::index`])
    /// into percentages.
    pub fn from_probabilities(probs: [f32; 3]) -> Self {
        Self {
            epileptic: probs[0] * 100.0,
            non_epileptic: probs[1] * 100.0,
            psychogenic: probs[2] * 100.0,
        }
    }

    pub fn get(&self, label: ClassLabel) -> f32 {
        match label {
            ClassLabel::Epileptic => self.epileptic,
            ClassLabel::NonEpileptic => self.non_epileptic,
            ClassLabel::Psychogenic => self.psychogenic,
        }
    }

    pub fn total(&self) -> f32 {
        self.epileptic + self.non_epileptic + self.psychogenic
    }
}

/// One detected seizure span as `MM:SS` start/end timestamps.
///
/// Serializes as a `[start, end]` pair, matching the stored document layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeizureInterval(pub String, pub String);

impl SeizureInterval {
    #[inline]
    pub fn start(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn end(&self) -> &str {
        &self.1
    }
}

/// The pipeline's classification verdict for one recording.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    #[serde(rename = "result")]
    pub label: ClassLabel,
    pub confidence: Confidence,
    /// Empty unless `label` is [`ClassLabel::Epileptic`].
    pub seizure_intervals: Vec<SeizureInterval>,
}

/// A classification plus every fallback the pipeline absorbed producing it.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    #[serde(flatten)]
    pub classification: Classification,
    pub diagnostics: Vec<PipelineWarning>,
}

impl Analysis {
    /// True when no fallback path was taken anywhere in the run.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
