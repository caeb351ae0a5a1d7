//! Graph neural network classifier.
//!
//! The topology is fixed and declared as data: [`architecture`] returns the
//! ordered layer stack, and [`GnnModel`] is built from it, either with
//! persisted weights or with a fresh (untrained) initialization. Inference
//! always runs in evaluation mode: dropout is a no-op and batch norm uses
//! its running statistics.
//!
//! Class indices are fixed: 0 epileptic, 1 non-epileptic, 2 psychogenic.
pub mod layers;
pub mod weights;

use std::path::Path;

use anyhow::{bail, Result};
use log::{error, info, warn};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::features::FEATURE_DIM;
use crate::graph::ChannelGraph;
use layers::{log_softmax, leaky_relu, BatchNorm, GatConv, GcnConv, Linear};
use weights::StateDict;

/// Node feature dimensionality consumed by the first convolution.
pub const INPUT_DIM: usize = FEATURE_DIM;
/// Number of output classes.
pub const NUM_CLASSES: usize = 3;
/// Widths of the five convolution blocks.
pub const CONV_WIDTHS: [usize; 5] = [256, 128, 64, 32, 16];
/// Attention heads in the second block (averaged, not concatenated).
pub const GAT_HEADS: usize = 4;
/// Negative slope of every activation in the stack.
pub const NEG_SLOPE: f32 = 0.01;
/// Dropout rate (training only; inference runs in eval mode).
pub const DROPOUT_RATE: f32 = 0.5;

/// One typed layer descriptor; the model topology is a sequence of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerSpec {
    GcnConv { input: usize, output: usize },
    GatConv { input: usize, output: usize, heads: usize },
    BatchNorm { features: usize },
    LeakyRelu { negative_slope: f32 },
    Dropout { rate: f32 },
    Linear { input: usize, output: usize },
    LogSoftmax,
}

/// The fixed classifier topology.
///
/// Five convolution blocks of decreasing width (the second one attentional),
/// each followed by batch norm, activation, and dropout; then two dense
/// layers and a per-node log-softmax.
pub fn architecture() -> Vec<LayerSpec> {
    let mut spec = Vec::new();
    let mut input = INPUT_DIM;
    for (k, &width) in CONV_WIDTHS.iter().enumerate() {
        if k == 1 {
            spec.push(LayerSpec::GatConv { input, output: width, heads: GAT_HEADS });
        } else {
            spec.push(LayerSpec::GcnConv { input, output: width });
        }
        spec.push(LayerSpec::BatchNorm { features: width });
        spec.push(LayerSpec::LeakyRelu { negative_slope: NEG_SLOPE });
        spec.push(LayerSpec::Dropout { rate: DROPOUT_RATE });
        input = width;
    }
    spec.push(LayerSpec::Linear { input, output: 8 });
    spec.push(LayerSpec::LeakyRelu { negative_slope: NEG_SLOPE });
    spec.push(LayerSpec::Dropout { rate: DROPOUT_RATE });
    spec.push(LayerSpec::Linear { input: 8, output: NUM_CLASSES });
    spec.push(LayerSpec::LogSoftmax);
    spec
}

enum Layer {
    Gcn(GcnConv),
    Gat(GatConv),
    Norm(BatchNorm),
    LeakyRelu(f32),
    Dropout(#[allow(dead_code)] f32),
    Dense(Linear),
    LogSoftmax,
}

/// The classifier model: the realized layer stack of [`architecture`].
pub struct GnnModel {
    layers: Vec<Layer>,
    /// True when built from a fresh initialization instead of loaded weights.
    untrained: bool,
}

/// Where layer parameters come from while building the stack.
enum ParamSource<'a> {
    Dict(&'a StateDict),
    Fresh(StdRng),
}

impl ParamSource<'_> {
    /// Weight matrix: from the dict, or Glorot-uniform initialized.
    fn matrix(&mut self, name: &str, rows: usize, cols: usize) -> Result<Array2<f32>> {
        match self {
            ParamSource::Dict(d) => d.array2(name, rows, cols),
            ParamSource::Fresh(rng) => {
                let limit = (6.0 / (rows + cols) as f64).sqrt();
                Ok(Array2::from_shape_fn((rows, cols), |_| {
                    rng.gen_range(-limit..limit) as f32
                }))
            }
        }
    }

    /// Vector parameter with a constant fresh-init value (0 for biases and
    /// running means, 1 for batch-norm gains and running variances).
    fn vector(&mut self, name: &str, len: usize, fresh: f32) -> Result<Array1<f32>> {
        match self {
            ParamSource::Dict(d) => d.array1(name, len),
            ParamSource::Fresh(_) => Ok(Array1::from_elem(len, fresh)),
        }
    }
}

impl GnnModel {
    /// Build the model from persisted weights.
    pub fn from_state(dict: &StateDict) -> Result<Self> {
        Self::build(ParamSource::Dict(dict))
    }

    /// Build the model with a fresh, seeded initialization.
    ///
    /// Predictions from an untrained model are essentially arbitrary; the
    /// pipeline surfaces this via
    /// [`crate::PipelineWarning::UntrainedModel`].
    pub fn untrained(seed: u64) -> Self {
        Self::build(ParamSource::Fresh(StdRng::seed_from_u64(seed)))
            .expect("fresh initialization cannot fail")
    }

    /// Load weights from `path`, falling back to an untrained model on any
    /// failure. Returns the model and whether the fallback was taken.
    pub fn load_or_untrained(path: &Path, seed: u64) -> (Self, bool) {
        match StateDict::load(path).and_then(|d| Self::from_state(&d)) {
            Ok(model) => {
                info!("loaded model weights from {}", path.display());
                (model, false)
            }
            Err(e) => {
                error!(
                    "could not load model weights from {}: {e:#}; using untrained model",
                    path.display()
                );
                (Self::untrained(seed), true)
            }
        }
    }

    fn build(mut source: ParamSource<'_>) -> Result<Self> {
        let untrained = matches!(source, ParamSource::Fresh(_));
        let mut layers = Vec::new();
        let mut conv_idx = 0usize;
        let mut fc_idx = 0usize;

        for spec in architecture() {
            match spec {
                LayerSpec::GcnConv { input, output } => {
                    conv_idx += 1;
                    let p = format!("conv{conv_idx}");
                    layers.push(Layer::Gcn(GcnConv {
                        weight: source.matrix(&format!("{p}.weight"), input, output)?,
                        bias: source.vector(&format!("{p}.bias"), output, 0.0)?,
                    }));
                }
                LayerSpec::GatConv { input, output, heads } => {
                    conv_idx += 1;
                    let p = format!("conv{conv_idx}");
                    layers.push(Layer::Gat(GatConv {
                        heads,
                        weight: source.matrix(&format!("{p}.weight"), input, heads * output)?,
                        att_src: source.matrix(&format!("{p}.att_src"), heads, output)?,
                        att_dst: source.matrix(&format!("{p}.att_dst"), heads, output)?,
                        bias: source.vector(&format!("{p}.bias"), output, 0.0)?,
                    }));
                }
                LayerSpec::BatchNorm { features } => {
                    let p = format!("bn{conv_idx}");
                    layers.push(Layer::Norm(BatchNorm {
                        gamma: source.vector(&format!("{p}.weight"), features, 1.0)?,
                        beta: source.vector(&format!("{p}.bias"), features, 0.0)?,
                        running_mean: source.vector(&format!("{p}.running_mean"), features, 0.0)?,
                        running_var: source.vector(&format!("{p}.running_var"), features, 1.0)?,
                    }));
                }
                LayerSpec::LeakyRelu { negative_slope } => {
                    layers.push(Layer::LeakyRelu(negative_slope));
                }
                LayerSpec::Dropout { rate } => {
                    layers.push(Layer::Dropout(rate));
                }
                LayerSpec::Linear { input, output } => {
                    fc_idx += 1;
                    let p = format!("fc{fc_idx}");
                    layers.push(Layer::Dense(Linear {
                        weight: source.matrix(&format!("{p}.weight"), input, output)?,
                        bias: source.vector(&format!("{p}.bias"), output, 0.0)?,
                    }));
                }
                LayerSpec::LogSoftmax => layers.push(Layer::LogSoftmax),
            }
        }

        Ok(Self { layers, untrained })
    }

    pub fn is_untrained(&self) -> bool {
        self.untrained
    }

    /// Per-node class log-probabilities, shape `[n_nodes, NUM_CLASSES]`.
    ///
    /// Evaluation mode throughout: dropout layers are identity.
    pub fn forward(&self, graph: &ChannelGraph) -> Result<Array2<f32>> {
        if graph.n_nodes() == 0 {
            bail!("cannot classify an empty graph");
        }
        if graph.node_features.ncols() != INPUT_DIM {
            bail!(
                "node feature dimension {} does not match model input {INPUT_DIM}",
                graph.node_features.ncols()
            );
        }

        let mut x = graph.node_features.clone();
        for layer in &self.layers {
            x = match layer {
                Layer::Gcn(conv) => conv.forward(&x, &graph.edges),
                Layer::Gat(conv) => conv.forward(&x, &graph.edges),
                Layer::Norm(bn) => bn.forward(&x),
                Layer::LeakyRelu(slope) => {
                    leaky_relu(&mut x, *slope);
                    x
                }
                Layer::Dropout(_) => x, // eval mode
                Layer::Dense(fc) => fc.forward(&x),
                Layer::LogSoftmax => {
                    log_softmax(&mut x);
                    x
                }
            };
        }
        Ok(x)
    }
}

/// Node aggregation: convert per-node log-probabilities to probabilities and
/// mean them into one whole-graph distribution.
pub fn aggregate(log_probs: &Array2<f32>) -> [f32; NUM_CLASSES] {
    let n = log_probs.nrows().max(1) as f32;
    let mut out = [0.0_f32; NUM_CLASSES];
    for row in log_probs.rows() {
        for (slot, &lp) in out.iter_mut().zip(row.iter()) {
            *slot += lp.exp();
        }
    }
    for slot in &mut out {
        *slot /= n;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ChannelFeatures;
    use crate::graph;
    use ndarray::array;

    fn test_graph(n: usize) -> ChannelGraph {
        let features: Vec<ChannelFeatures> = (0..n)
            .map(|i| ChannelFeatures {
                mean: 0.1 * i as f32,
                std: 1.0,
                max: 3.0,
                min: -3.0,
                kurtosis: 3.0,
                skewness: 0.1,
                delta: 1.0,
                theta: 0.5,
                alpha: 2.0,
                beta: 0.25,
                gamma: 0.1,
            })
            .collect();
        graph::build(&features)
    }

    #[test]
    fn architecture_matches_fixed_topology() {
        let spec = architecture();
        // 5 conv blocks × 4 entries + fc1 + act + dropout + fc2 + logsoftmax.
        assert_eq!(spec.len(), 25);
        assert_eq!(spec[0], LayerSpec::GcnConv { input: 11, output: 256 });
        assert_eq!(
            spec[4],
            LayerSpec::GatConv { input: 256, output: 128, heads: 4 }
        );
        assert_eq!(spec[20], LayerSpec::Linear { input: 16, output: 8 });
        assert_eq!(spec[23], LayerSpec::Linear { input: 8, output: 3 });
        assert_eq!(spec[24], LayerSpec::LogSoftmax);
    }

    #[test]
    fn untrained_forward_yields_log_distributions() {
        let model = GnnModel::untrained(11);
        assert!(model.is_untrained());
        let g = test_graph(5);
        let out = model.forward(&g).unwrap();
        assert_eq!(out.shape(), &[5, NUM_CLASSES]);
        for row in out.rows() {
            let total: f32 = row.iter().map(|&v| v.exp()).sum();
            approx::assert_abs_diff_eq!(total, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn aggregate_means_probabilities_across_nodes() {
        // Two nodes with opposite certain predictions → uniform-ish mean.
        let lp = array![[0.0_f32, -30.0, -30.0], [-30.0, 0.0, -30.0]];
        let probs = aggregate(&lp);
        approx::assert_abs_diff_eq!(probs[0], 0.5, epsilon = 1e-4);
        approx::assert_abs_diff_eq!(probs[1], 0.5, epsilon = 1e-4);
        assert!(probs[2] < 1e-4);
    }

    #[test]
    fn aggregate_output_sums_to_one() {
        let model = GnnModel::untrained(3);
        let out = model.forward(&test_graph(22)).unwrap();
        let probs = aggregate(&out);
        let total: f32 = probs.iter().sum();
        approx::assert_abs_diff_eq!(total, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn wrong_feature_dim_is_rejected() {
        let model = GnnModel::untrained(1);
        let g = ChannelGraph {
            node_features: Array2::zeros((3, 7)),
            edges: vec![(0, 1), (1, 0)],
        };
        assert!(model.forward(&g).is_err());
    }

    #[test]
    fn untrained_is_deterministic_per_seed() {
        let a = GnnModel::untrained(9);
        let b = GnnModel::untrained(9);
        let g = test_graph(4);
        let out_a = a.forward(&g).unwrap();
        let out_b = b.forward(&g).unwrap();
        approx::assert_abs_diff_eq!(
            out_a.as_slice().unwrap(),
            out_b.as_slice().unwrap(),
            epsilon = 0.0
        );
    }
}
