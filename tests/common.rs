/// Shared helpers for integration tests: deterministic weight-file and EDF
/// fixtures.
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use ictal::gnn::weights::StateWriter;
use ictal::gnn::{CONV_WIDTHS, GAT_HEADS, INPUT_DIM, NUM_CLASSES};

/// Deterministic bounded values for a parameter tensor.
#[allow(unused)]
pub fn fill(n: usize, scale: f32) -> Vec<f32> {
    (0..n).map(|i| (i as f32 * 0.37).sin() * scale).collect()
}

/// Strictly positive values for running variances.
#[allow(unused)]
fn fill_positive(n: usize) -> Vec<f32> {
    (0..n).map(|i| 1.0 + 0.1 * (i as f32 * 0.37).sin()).collect()
}

/// Write a complete, shape-correct weight file with every parameter name
/// under `prefix` (e.g. `""` or `"model_state_dict."`).
#[allow(unused)]
pub fn write_weight_file(dir: &Path, prefix: &str) -> PathBuf {
    let path = dir.join("gnn.safetensors");
    let mut w = StateWriter::new();
    let p = |name: &str| format!("{prefix}{name}");

    let mut input = INPUT_DIM;
    for (k, &width) in CONV_WIDTHS.iter().enumerate() {
        let conv = format!("conv{}", k + 1);
        if k == 1 {
            w.add(&p(&format!("{conv}.weight")), &fill(input * GAT_HEADS * width, 0.05), &[input, GAT_HEADS * width]);
            w.add(&p(&format!("{conv}.att_src")), &fill(GAT_HEADS * width, 0.05), &[GAT_HEADS, width]);
            w.add(&p(&format!("{conv}.att_dst")), &fill(GAT_HEADS * width, 0.05), &[GAT_HEADS, width]);
        } else {
            w.add(&p(&format!("{conv}.weight")), &fill(input * width, 0.05), &[input, width]);
        }
        w.add(&p(&format!("{conv}.bias")), &fill(width, 0.01), &[width]);

        let bn = format!("bn{}", k + 1);
        w.add(&p(&format!("{bn}.weight")), &fill_positive(width), &[width]);
        w.add(&p(&format!("{bn}.bias")), &fill(width, 0.01), &[width]);
        w.add(&p(&format!("{bn}.running_mean")), &fill(width, 0.1), &[width]);
        w.add(&p(&format!("{bn}.running_var")), &fill_positive(width), &[width]);

        input = width;
    }

    w.add(&p("fc1.weight"), &fill(input * 8, 0.1), &[input, 8]);
    w.add(&p("fc1.bias"), &fill(8, 0.01), &[8]);
    w.add(&p("fc2.weight"), &fill(8 * NUM_CLASSES, 0.1), &[8, NUM_CLASSES]);
    w.add(&p("fc2.bias"), &fill(NUM_CLASSES, 0.01), &[NUM_CLASSES]);

    w.write(&path).expect("writing weight fixture");
    path
}

/// Write a minimal valid single-record EDF file: `labels` signals, `spr`
/// samples per (1 s) record, every sample at the given digital value.
#[allow(unused)]
pub fn write_edf(path: &Path, labels: &[&str], spr: usize, digital_value: i16) {
    let ns = labels.len();
    let mut f = File::create(path).expect("creating EDF fixture");
    let pad = |s: &str, w: usize| format!("{s:<w$}");

    let mut header = String::new();
    header.push_str(&pad("0", 8));
    header.push_str(&pad("X X X X", 80));
    header.push_str(&pad("Startdate X X X X", 80));
    header.push_str(&pad("01.01.25", 8));
    header.push_str(&pad("00.00.00", 8));
    header.push_str(&pad(&format!("{}", 256 * (1 + ns)), 8));
    header.push_str(&pad("", 44));
    header.push_str(&pad("1", 8));
    header.push_str(&pad("1", 8));
    header.push_str(&pad(&ns.to_string(), 4));

    for l in labels {
        header.push_str(&pad(l, 16));
    }
    for _ in labels {
        header.push_str(&pad("", 80));
    }
    for _ in labels {
        header.push_str(&pad("uV", 8));
    }
    for _ in labels {
        header.push_str(&pad("-3276.8", 8));
    }
    for _ in labels {
        header.push_str(&pad("3276.7", 8));
    }
    for _ in labels {
        header.push_str(&pad("-32768", 8));
    }
    for _ in labels {
        header.push_str(&pad("32767", 8));
    }
    for _ in labels {
        header.push_str(&pad("", 80));
    }
    for _ in labels {
        header.push_str(&pad(&spr.to_string(), 8));
    }
    for _ in labels {
        header.push_str(&pad("", 32));
    }
    f.write_all(header.as_bytes()).unwrap();

    for _ in labels {
        for _ in 0..spr {
            f.write_all(&digital_value.to_le_bytes()).unwrap();
        }
    }
}
