//! Native EDF(+) reader.
//!
//! # Algorithm
//! 1. Parse the 256-byte fixed header.
//! 2. Parse the per-signal subheaders (256 bytes × n_signals, field-major).
//! 3. Walk the data records: each record is the concatenation, per signal,
//!    of `samples_per_record` little-endian i16 samples.
//!
//! # Calibration
//! ```text
//! bit_value = (physical_max − physical_min) / (digital_max − digital_min)
//! offset    = physical_max / bit_value − digital_max
//! physical  = bit_value · (offset + digital)
//! ```
//!
//! Annotation signals (`EDF Annotations`) are parsed past but excluded from
//! the returned data matrix.
pub mod header;
pub mod reader;

pub use header::{EdfHeader, SignalParam};
pub use reader::{open, EdfFile};
