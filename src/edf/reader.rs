//! EDF data reading.
//!
//! `open` parses the headers without touching sample data; `read_all_data`
//! streams every record into a calibrated `[n_channels, n_samples]` matrix,
//! skipping annotation signals.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::Array2;

use super::header::{parse, EdfHeader, HEADER_BYTES};

/// An opened EDF file: parsed header plus the path for deferred data reads.
#[derive(Debug, Clone)]
pub struct EdfFile {
    pub header: EdfHeader,
    pub path: PathBuf,
}

impl EdfFile {
    /// Indices of the non-annotation signals, in file order.
    pub fn data_signals(&self) -> Vec<usize> {
        self.header
            .signals
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_annotation())
            .map(|(i, _)| i)
            .collect()
    }

    /// Channel names of the data signals.
    pub fn channel_names(&self) -> Vec<String> {
        self.data_signals()
            .into_iter()
            .map(|i| self.header.signals[i].label.clone())
            .collect()
    }

    /// Shared sampling rate of the data signals in Hz.
    ///
    /// EDF permits per-signal rates; this pipeline requires a uniform rate
    /// across channels and refuses mixed-rate files.
    pub fn sampling_rate(&self) -> Result<f64> {
        let idx = self.data_signals();
        let Some(&first) = idx.first() else {
            bail!("no data signals in file");
        };
        let spr = self.header.signals[first].samples_per_record;
        if idx.iter().any(|&i| self.header.signals[i].samples_per_record != spr) {
            bail!("mixed per-signal sampling rates are not supported");
        }
        Ok(spr as f64 / self.header.record_duration)
    }

    /// Read every data record into a calibrated `[n_channels, n_samples]`
    /// f32 matrix (annotation signals excluded).
    pub fn read_all_data(&self) -> Result<Array2<f32>> {
        let idx = self.data_signals();
        if idx.is_empty() {
            bail!("no data signals in file");
        }
        let spr = self.header.signals[idx[0]].samples_per_record;
        self.sampling_rate()?; // validates uniformity

        let n_ch = idx.len();
        let n_t = self.header.n_records * spr;
        let mut out = Array2::<f32>::zeros((n_ch, n_t));

        let file = File::open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        let mut reader = BufReader::new(file);

        // Skip past the headers.
        let header_len = HEADER_BYTES * (1 + self.header.signals.len());
        std::io::copy(
            &mut reader.by_ref().take(header_len as u64),
            &mut std::io::sink(),
        )?;

        let mut record = vec![0u8; self.header.record_bytes()];
        for r in 0..self.header.n_records {
            reader
                .read_exact(&mut record)
                .with_context(|| format!("short read in data record {r}"))?;

            let mut byte_off = 0usize;
            let mut ch_row = 0usize;
            for (sig_i, sig) in self.header.signals.iter().enumerate() {
                let n_bytes = sig.samples_per_record * 2;
                if idx.contains(&sig_i) {
                    let t0 = r * spr;
                    for (k, pair) in record[byte_off..byte_off + n_bytes]
                        .chunks_exact(2)
                        .enumerate()
                    {
                        let digital = i16::from_le_bytes([pair[0], pair[1]]);
                        out[[ch_row, t0 + k]] = sig.to_physical(digital) as f32;
                    }
                    ch_row += 1;
                }
                byte_off += n_bytes;
            }
        }

        Ok(out)
    }
}

/// Open an EDF file, parsing its headers only.
pub fn open<P: AsRef<Path>>(path: P) -> Result<EdfFile> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut fixed = [0u8; HEADER_BYTES];
    reader
        .read_exact(&mut fixed)
        .context("file shorter than the EDF fixed header")?;

    let n_signals: usize = std::str::from_utf8(&fixed[252..256])
        .ok()
        .map(str::trim)
        .and_then(|s| s.parse().ok())
        .context("invalid signal count field")?;
    if n_signals == 0 {
        bail!("EDF file declares zero signals");
    }

    let mut subheaders = vec![0u8; n_signals * HEADER_BYTES];
    reader
        .read_exact(&mut subheaders)
        .context("file shorter than its signal subheaders")?;

    let header = parse(&fixed, &subheaders, n_signals)?;
    Ok(EdfFile {
        header,
        path: path.to_path_buf(),
    })
}
