//! EDF header and per-signal subheader parsing.
//!
//! All header fields are fixed-width ASCII. The fixed header is 256 bytes;
//! each signal contributes another 256 bytes laid out field-major (all
//! labels, then all transducers, and so on).
use anyhow::{bail, Context, Result};

/// Size of the fixed header and of each signal's subheader share.
pub const HEADER_BYTES: usize = 256;

/// Parameters of one signal in an EDF file.
#[derive(Debug, Clone)]
pub struct SignalParam {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
    pub prefilter: String,
    pub samples_per_record: usize,
}

impl SignalParam {
    /// Physical units per digital step.
    pub fn bit_value(&self) -> f64 {
        (self.physical_max - self.physical_min) / (self.digital_max - self.digital_min) as f64
    }

    /// Digital offset such that `physical = bit_value · (offset + digital)`.
    pub fn offset(&self) -> f64 {
        self.physical_max / self.bit_value() - self.digital_max as f64
    }

    /// Convert a stored digital sample to physical units.
    #[inline]
    pub fn to_physical(&self, digital: i16) -> f64 {
        self.bit_value() * (self.offset() + digital as f64)
    }

    /// True for EDF+ annotation streams, which carry no signal data.
    pub fn is_annotation(&self) -> bool {
        self.label.trim() == "EDF Annotations"
    }
}

/// Parsed EDF header: recording metadata plus one [`SignalParam`] per signal.
#[derive(Debug, Clone)]
pub struct EdfHeader {
    pub patient: String,
    pub recording: String,
    pub start_date: String,
    pub start_time: String,
    pub n_records: usize,
    /// Duration of one data record in seconds.
    pub record_duration: f64,
    pub signals: Vec<SignalParam>,
}

impl EdfHeader {
    /// Byte length of one data record (2 bytes per sample, every signal).
    pub fn record_bytes(&self) -> usize {
        self.signals.iter().map(|s| s.samples_per_record * 2).sum()
    }
}

fn field<'a>(bytes: &'a [u8], start: usize, len: usize) -> Result<&'a str> {
    let raw = bytes
        .get(start..start + len)
        .context("header truncated")?;
    std::str::from_utf8(raw)
        .map(str::trim)
        .context("non-ASCII header field")
}

fn num_field<T: std::str::FromStr>(bytes: &[u8], start: usize, len: usize, what: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    field(bytes, start, len)?
        .parse::<T>()
        .with_context(|| format!("invalid {what} field"))
}

/// Parse the fixed header from its first 256 bytes, then the signal
/// subheaders from the following `256 × n_signals` bytes.
pub fn parse(fixed: &[u8], subheaders: &[u8], n_signals: usize) -> Result<EdfHeader> {
    let version = field(fixed, 0, 8)?;
    if version != "0" {
        bail!("unsupported EDF version marker {version:?}");
    }

    let patient = field(fixed, 8, 80)?.to_string();
    let recording = field(fixed, 88, 80)?.to_string();
    let start_date = field(fixed, 168, 8)?.to_string();
    let start_time = field(fixed, 176, 8)?.to_string();
    let n_records: i64 = num_field(fixed, 236, 8, "record count")?;
    if n_records < 0 {
        bail!("record count unknown (-1) is not supported");
    }
    let record_duration: f64 = num_field(fixed, 244, 8, "record duration")?;
    if !(record_duration > 0.0) {
        bail!("non-positive record duration {record_duration}");
    }

    if subheaders.len() < n_signals * HEADER_BYTES {
        bail!("signal subheaders truncated");
    }

    // Field-major layout: all 16-byte labels first, then 80-byte
    // transducers, and so on.
    let mut signals = Vec::with_capacity(n_signals);
    for i in 0..n_signals {
        let label = field(subheaders, i * 16, 16)?.to_string();
        let transducer = field(subheaders, 16 * n_signals + i * 80, 80)?.to_string();
        let physical_dimension = field(subheaders, 96 * n_signals + i * 8, 8)?.to_string();
        let physical_min: f64 = num_field(subheaders, 104 * n_signals + i * 8, 8, "physical min")?;
        let physical_max: f64 = num_field(subheaders, 112 * n_signals + i * 8, 8, "physical max")?;
        let digital_min: i32 = num_field(subheaders, 120 * n_signals + i * 8, 8, "digital min")?;
        let digital_max: i32 = num_field(subheaders, 128 * n_signals + i * 8, 8, "digital max")?;
        let prefilter = field(subheaders, 136 * n_signals + i * 80, 80)?.to_string();
        let samples_per_record: usize =
            num_field(subheaders, 216 * n_signals + i * 8, 8, "samples per record")?;

        if digital_max == digital_min {
            bail!("signal {label:?}: digital range is empty");
        }
        if samples_per_record == 0 {
            bail!("signal {label:?}: zero samples per record");
        }

        signals.push(SignalParam {
            label,
            transducer,
            physical_dimension,
            physical_min,
            physical_max,
            digital_min,
            digital_max,
            prefilter,
            samples_per_record,
        });
    }

    Ok(EdfHeader {
        patient,
        recording,
        start_date,
        start_time,
        n_records: n_records as usize,
        record_duration,
        signals,
    })
}
