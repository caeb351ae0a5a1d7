//! Model weight persistence.
//!
//! Weights live in a safetensors file: an 8-byte little-endian header length,
//! a JSON header mapping parameter names to dtype/shape/offsets, then raw
//! tensor bytes. Only F32 tensors are read. Parameter names may be flat
//! (`conv1.weight`) or nested under a `model_state_dict.` / `state_dict.`
//! prefix; the loader tries all three placements.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2};

/// Nested-placement prefixes tried after the flat layout.
const PREFIXES: [&str; 3] = ["", "model_state_dict.", "state_dict."];

/// Key used to decide which placement a file uses.
const PROBE_KEY: &str = "conv1.weight";

/// A parsed parameter mapping: name → (shape, values).
#[derive(Debug, Clone, Default)]
pub struct StateDict {
    tensors: HashMap<String, (Vec<usize>, Vec<f32>)>,
    prefix: &'static str,
}

impl StateDict {
    /// Parse a safetensors file and resolve the parameter placement.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading weight file {}", path.display()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            bail!("weight file too small for a safetensors header");
        }
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        let header: HashMap<String, serde_json::Value> = serde_json::from_slice(
            bytes.get(8..8 + n).context("truncated safetensors header")?,
        )
        .context("failed to parse safetensors header")?;
        let data_start = 8 + n;

        let mut tensors = HashMap::new();
        for (key, entry) in &header {
            if key == "__metadata__" {
                continue;
            }
            let dtype = entry["dtype"].as_str().context("missing dtype")?;
            if dtype != "F32" {
                bail!("parameter {key}: unsupported dtype {dtype}");
            }
            let offsets = entry["data_offsets"]
                .as_array()
                .context("missing data_offsets")?;
            let s = offsets[0].as_u64().context("bad offset")? as usize;
            let e = offsets[1].as_u64().context("bad offset")? as usize;
            let raw = bytes
                .get(data_start + s..data_start + e)
                .context("tensor data out of bounds")?;
            let values: Vec<f32> = raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            let shape: Vec<usize> = entry["shape"]
                .as_array()
                .context("missing shape")?
                .iter()
                .map(|v| v.as_u64().map(|u| u as usize).context("bad shape entry"))
                .collect::<Result<_>>()?;

            let expect: usize = shape.iter().product();
            if values.len() != expect {
                bail!("parameter {key}: {} values for shape {shape:?}", values.len());
            }
            tensors.insert(key.clone(), (shape, values));
        }

        let prefix = PREFIXES
            .into_iter()
            .find(|p| tensors.contains_key(&format!("{p}{PROBE_KEY}")))
            .with_context(|| format!("no placement of {PROBE_KEY} found in weight file"))?;

        Ok(Self { tensors, prefix })
    }

    /// Fetch a 2-D parameter, checking its shape.
    pub fn array2(&self, name: &str, rows: usize, cols: usize) -> Result<Array2<f32>> {
        let (shape, values) = self.raw(name)?;
        if shape != [rows, cols] {
            bail!("parameter {name}: expected shape [{rows}, {cols}], found {shape:?}");
        }
        Ok(Array2::from_shape_vec((rows, cols), values.to_vec())?)
    }

    /// Fetch a 1-D parameter, checking its length.
    pub fn array1(&self, name: &str, len: usize) -> Result<Array1<f32>> {
        let (shape, values) = self.raw(name)?;
        if shape != [len] {
            bail!("parameter {name}: expected shape [{len}], found {shape:?}");
        }
        Ok(Array1::from_vec(values.to_vec()))
    }

    fn raw(&self, name: &str) -> Result<(&[usize], &[f32])> {
        let key = format!("{}{}", self.prefix, name);
        let (shape, values) = self
            .tensors
            .get(&key)
            .with_context(|| format!("missing parameter {key}"))?;
        Ok((shape, values))
    }
}

/// Safetensors writer for F32 parameters (used by tests and tooling to
/// produce weight files the loader accepts).
#[derive(Default)]
pub struct StateWriter {
    entries: Vec<(String, Vec<u8>, Vec<usize>)>,
}

impl StateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, shape.to_vec()));
    }

    pub fn add_array2(&mut self, name: &str, arr: &Array2<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_array1(&mut self, name: &str, arr: &Array1<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add(name, &data, &[arr.len()]);
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;

        let mut header_map = serde_json::Map::new();
        let mut offset = 0usize;
        for (name, data, shape) in &self.entries {
            header_map.insert(
                name.clone(),
                serde_json::json!({
                    "dtype": "F32",
                    "shape": shape,
                    "data_offsets": [offset, offset + data.len()],
                }),
            );
            offset += data.len();
        }
        let hdr = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr.len() % 8) % 8;
        let padded: Vec<u8> = hdr.into_iter().chain(std::iter::repeat(b' ').take(pad)).collect();

        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn round_trip(prefix: &str) -> StateDict {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.safetensors");

        let mut w = StateWriter::new();
        w.add_array2(&format!("{prefix}conv1.weight"), &array![[1.0_f32, 2.0], [3.0, 4.0]]);
        w.add_array1(&format!("{prefix}conv1.bias"), &array![0.5_f32, -0.5]);
        w.write(&path).unwrap();

        StateDict::load(&path).unwrap()
    }

    #[test]
    fn flat_placement_loads() {
        let sd = round_trip("");
        let w = sd.array2("conv1.weight", 2, 2).unwrap();
        approx::assert_abs_diff_eq!(w[[1, 0]], 3.0, epsilon = 1e-7);
    }

    #[test]
    fn nested_model_state_dict_placement_loads() {
        let sd = round_trip("model_state_dict.");
        let b = sd.array1("conv1.bias", 2).unwrap();
        approx::assert_abs_diff_eq!(b[0], 0.5, epsilon = 1e-7);
    }

    #[test]
    fn nested_state_dict_placement_loads() {
        let sd = round_trip("state_dict.");
        assert!(sd.array2("conv1.weight", 2, 2).is_ok());
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let sd = round_trip("");
        assert!(sd.array2("conv1.weight", 3, 2).is_err());
    }

    #[test]
    fn malformed_bytes_are_an_error() {
        assert!(StateDict::from_bytes(b"junk").is_err());
        assert!(StateDict::from_bytes(&[0u8; 4]).is_err());
    }
}
