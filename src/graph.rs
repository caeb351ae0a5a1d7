//! Channel-graph construction.
//!
//! Channels become nodes carrying their feature vectors; connectivity is the
//! complete directed graph without self-loops. Edge enumeration order is
//! fixed (`for i { for j if j != i }`) so downstream consumers and tests see
//! a reproducible edge list.
use ndarray::Array2;

use crate::features::{ChannelFeatures, FEATURE_DIM};

/// A fully connected directed channel graph with node feature matrix.
#[derive(Debug, Clone)]
pub struct ChannelGraph {
    /// Node features, shape `[n_nodes, FEATURE_DIM]`, row i = channel i.
    pub node_features: Array2<f32>,
    /// Directed edges `(src, dst)`, every ordered pair with `src != dst`.
    pub edges: Vec<(usize, usize)>,
}

impl ChannelGraph {
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.node_features.nrows()
    }

    #[inline]
    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }
}

/// Assemble the graph for an ordered channel feature list.
///
/// Always succeeds for non-empty input; |E| = n·(n−1).
pub fn build(features: &[ChannelFeatures]) -> ChannelGraph {
    let n = features.len();
    let mut node_features = Array2::<f32>::zeros((n, FEATURE_DIM));
    for (i, f) in features.iter().enumerate() {
        for (j, v) in f.as_array().into_iter().enumerate() {
            node_features[[i, j]] = v;
        }
    }

    let mut edges = Vec::with_capacity(n.saturating_sub(1) * n);
    for i in 0..n {
        for j in 0..n {
            if i != j {
                edges.push((i, j));
            }
        }
    }

    ChannelGraph { node_features, edges }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_features(n: usize) -> Vec<ChannelFeatures> {
        (0..n)
            .map(|i| ChannelFeatures {
                mean: i as f32,
                std: 1.0,
                max: 2.0,
                min: -2.0,
                kurtosis: 3.0,
                skewness: 0.0,
                delta: 0.1,
                theta: 0.2,
                alpha: 0.3,
                beta: 0.4,
                gamma: 0.5,
            })
            .collect()
    }

    #[test]
    fn complete_digraph_edge_count() {
        for n in [1usize, 2, 5, 22] {
            let g = build(&flat_features(n));
            assert_eq!(g.n_edges(), n * n.saturating_sub(1));
            assert!(g.edges.iter().all(|&(i, j)| i != j), "self-loop for n={n}");
        }
    }

    #[test]
    fn edge_enumeration_order_is_row_major() {
        let g = build(&flat_features(3));
        assert_eq!(
            g.edges,
            vec![(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)]
        );
    }

    #[test]
    fn node_rows_align_with_channels() {
        let g = build(&flat_features(4));
        assert_eq!(g.node_features.shape(), &[4, FEATURE_DIM]);
        for i in 0..4 {
            approx::assert_abs_diff_eq!(g.node_features[[i, 0]], i as f32, epsilon = 0.0);
        }
    }
}
