//! Graph layer primitives, evaluation-mode only.
//!
//! All layers operate on a node feature matrix `[n_nodes, features]` and,
//! for the graph convolutions, the directed edge list of the channel graph.
//! Self-loops are added internally by both convolution types, matching the
//! usual propagation rules.
use ndarray::{Array1, Array2, Axis};

/// Negative slope of the attention scoring nonlinearity.
const ATT_NEG_SLOPE: f32 = 0.2;

/// Batch-norm variance epsilon.
pub const BN_EPS: f32 = 1e-5;

/// Graph convolution with symmetric degree normalization.
///
/// `out[i] = Σ_{j ∈ N(i) ∪ {i}} x[j]·W / √(deg[j]·deg[i]) + b`
/// where `deg` counts incoming edges plus the self-loop.
#[derive(Debug, Clone)]
pub struct GcnConv {
    /// `[in, out]`
    pub weight: Array2<f32>,
    /// `[out]`
    pub bias: Array1<f32>,
}

impl GcnConv {
    pub fn forward(&self, x: &Array2<f32>, edges: &[(usize, usize)]) -> Array2<f32> {
        let n = x.nrows();
        let support = x.dot(&self.weight);

        let mut deg = vec![1.0_f32; n]; // self-loop
        for &(_, dst) in edges {
            deg[dst] += 1.0;
        }
        let inv_sqrt: Vec<f32> = deg.iter().map(|&d| 1.0 / d.sqrt()).collect();

        let mut out = Array2::<f32>::zeros(support.raw_dim());
        // Self-loop contribution.
        for i in 0..n {
            let c = inv_sqrt[i] * inv_sqrt[i];
            out.row_mut(i).scaled_add(c, &support.row(i));
        }
        for &(src, dst) in edges {
            let c = inv_sqrt[src] * inv_sqrt[dst];
            out.row_mut(dst).scaled_add(c, &support.row(src));
        }

        out + &self.bias
    }
}

/// Multi-head graph attention with head averaging.
///
/// Additive attention: the score of edge j→i is
/// `leaky_relu(z[j]·a_src + z[i]·a_dst, 0.2)` with `z = x·W` per head,
/// softmax-normalized over each node's incoming neighborhood (self-loop
/// included). Head outputs are averaged, not concatenated.
#[derive(Debug, Clone)]
pub struct GatConv {
    pub heads: usize,
    /// `[in, heads·out]`
    pub weight: Array2<f32>,
    /// `[heads, out]`
    pub att_src: Array2<f32>,
    /// `[heads, out]`
    pub att_dst: Array2<f32>,
    /// `[out]` — averaged-head output bias.
    pub bias: Array1<f32>,
}

impl GatConv {
    pub fn out_dim(&self) -> usize {
        self.weight.ncols() / self.heads
    }

    pub fn forward(&self, x: &Array2<f32>, edges: &[(usize, usize)]) -> Array2<f32> {
        let n = x.nrows();
        let out_dim = self.out_dim();
        let z = x.dot(&self.weight); // [n, heads·out]

        // Incoming neighborhoods, self-loop included.
        let mut incoming: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        for &(src, dst) in edges {
            incoming[dst].push(src);
        }

        let mut out = Array2::<f32>::zeros((n, out_dim));
        for h in 0..self.heads {
            let cols = h * out_dim..(h + 1) * out_dim;
            let zh = z.slice(ndarray::s![.., cols]);

            // Per-node attention terms.
            let a_src: Vec<f32> = (0..n).map(|i| zh.row(i).dot(&self.att_src.row(h))).collect();
            let a_dst: Vec<f32> = (0..n).map(|i| zh.row(i).dot(&self.att_dst.row(h))).collect();

            for i in 0..n {
                let scores: Vec<f32> = incoming[i]
                    .iter()
                    .map(|&j| leaky_relu_scalar(a_src[j] + a_dst[i], ATT_NEG_SLOPE))
                    .collect();
                let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let exp: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
                let denom: f32 = exp.iter().sum();

                let mut row = out.row_mut(i);
                for (&j, &e) in incoming[i].iter().zip(exp.iter()) {
                    row.scaled_add(e / denom, &zh.row(j));
                }
            }
        }

        out.mapv_inplace(|v| v / self.heads as f32);
        out + &self.bias
    }
}

/// Batch normalization over node features, running-statistics (eval) form.
#[derive(Debug, Clone)]
pub struct BatchNorm {
    pub gamma: Array1<f32>,
    pub beta: Array1<f32>,
    pub running_mean: Array1<f32>,
    pub running_var: Array1<f32>,
}

impl BatchNorm {
    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        let scale = self
            .running_var
            .mapv(|v| 1.0 / (v + BN_EPS).sqrt())
            * &self.gamma;
        let shift = &self.beta - &(&self.running_mean * &scale);
        x * &scale + &shift
    }
}

/// Dense layer `y = x·W + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    /// `[in, out]`
    pub weight: Array2<f32>,
    /// `[out]`
    pub bias: Array1<f32>,
}

impl Linear {
    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weight) + &self.bias
    }
}

#[inline]
fn leaky_relu_scalar(v: f32, slope: f32) -> f32 {
    if v >= 0.0 {
        v
    } else {
        slope * v
    }
}

/// Elementwise leaky rectifier.
pub fn leaky_relu(x: &mut Array2<f32>, slope: f32) {
    x.mapv_inplace(|v| leaky_relu_scalar(v, slope));
}

/// Row-wise log-softmax, numerically stabilized.
pub fn log_softmax(x: &mut Array2<f32>) {
    for mut row in x.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let log_sum: f32 = row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln();
        row.mapv_inplace(|v| v - max - log_sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn complete_edges(n: usize) -> Vec<(usize, usize)> {
        let mut e = vec![];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    e.push((i, j));
                }
            }
        }
        e
    }

    #[test]
    fn gcn_on_complete_graph_mixes_all_nodes_equally() {
        // On a complete graph with self-loops every degree is n, so each
        // output row is the node-mean of x·W plus bias.
        let conv = GcnConv {
            weight: array![[1.0_f32], [0.0]],
            bias: array![0.5_f32],
        };
        let x = array![[1.0_f32, 9.0], [3.0, 9.0], [5.0, 9.0]];
        let out = conv.forward(&x, &complete_edges(3));
        for i in 0..3 {
            approx::assert_abs_diff_eq!(out[[i, 0]], 3.0 + 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn gat_attention_weights_sum_to_one() {
        // With zero attention vectors every score ties, so the output is the
        // plain neighborhood mean of z.
        let gat = GatConv {
            heads: 2,
            weight: Array2::from_shape_fn((1, 2), |_| 1.0),
            att_src: Array2::zeros((2, 1)),
            att_dst: Array2::zeros((2, 1)),
            bias: Array1::zeros(1),
        };
        let x = array![[2.0_f32], [4.0], [6.0]];
        let out = gat.forward(&x, &complete_edges(3));
        for i in 0..3 {
            approx::assert_abs_diff_eq!(out[[i, 0]], 4.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn batch_norm_eval_uses_running_stats() {
        let bn = BatchNorm {
            gamma: array![2.0_f32],
            beta: array![1.0_f32],
            running_mean: array![3.0_f32],
            running_var: array![4.0_f32],
        };
        let x = array![[5.0_f32], [3.0]];
        let out = bn.forward(&x);
        // (5-3)/2 * 2 + 1 = 3; (3-3)/2 * 2 + 1 = 1.
        approx::assert_abs_diff_eq!(out[[0, 0]], 3.0, epsilon = 1e-4);
        approx::assert_abs_diff_eq!(out[[1, 0]], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn log_softmax_rows_are_distributions() {
        let mut x = array![[1.0_f32, 2.0, 3.0], [-5.0, 0.0, 5.0]];
        log_softmax(&mut x);
        for row in x.axis_iter(Axis(0)) {
            let total: f32 = row.iter().map(|&v| v.exp()).sum();
            approx::assert_abs_diff_eq!(total, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn leaky_relu_negative_slope() {
        let mut x = array![[-1.0_f32, 2.0]];
        leaky_relu(&mut x, 0.01);
        approx::assert_abs_diff_eq!(x[[0, 0]], -0.01, epsilon = 1e-7);
        approx::assert_abs_diff_eq!(x[[0, 1]], 2.0, epsilon = 1e-7);
    }
}
