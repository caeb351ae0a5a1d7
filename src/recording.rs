//! Raw multichannel EEG recording.
//!
//! `samples` is channel-major `[C, T]`, the same orientation the rest of the
//! pipeline (feature extraction, interval detection) consumes. A recording is
//! never mutated after construction.
use ndarray::Array2;

/// An immutable EEG recording bundle.
#[derive(Debug, Clone)]
pub struct RawRecording {
    /// One name per channel, unique, index-aligned with rows of `samples`.
    pub channel_names: Vec<String>,
    /// Sampling rate in Hz (> 0).
    pub sampling_rate: f32,
    /// Signal matrix, shape `[n_channels, n_samples]`.
    pub samples: Array2<f32>,
    /// True when this recording was substituted for unreadable input.
    pub synthetic: bool,
}

impl RawRecording {
    /// Build a recording, checking the `channel_names`/`samples` alignment.
    ///
    /// Panics are reserved for programmer error; callers constructing from
    /// parsed files go through [`crate::edf`] which sizes both consistently.
    pub fn new(channel_names: Vec<String>, sampling_rate: f32, samples: Array2<f32>) -> Self {
        assert_eq!(
            channel_names.len(),
            samples.nrows(),
            "channel name count must match signal rows"
        );
        Self {
            channel_names,
            sampling_rate,
            samples,
            synthetic: false,
        }
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.samples.nrows()
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.ncols()
    }

    /// Total duration in seconds.
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.n_samples() as f64 / self.sampling_rate as f64
    }
}
