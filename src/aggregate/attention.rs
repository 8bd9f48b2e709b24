//! Attention aggregator: a learned convex combination of the raw neighbor
//! rows, scored against the node's own representation.
//!
//! A shared two-layer tanh key network maps both the node row and each
//! neighbor row into a key space; per-neighbor scores are the dot products
//! between a node's key and its neighbors' keys, softmax-normalized within
//! each neighborhood. The weighted sum runs over the RAW neighbor rows, so
//! the key network shapes only the weighting, not the values.

use super::{
    check_neighbor_block, softmax_per_group, Activation, Aggregate, AggregatorConfig, Combine,
};
use crate::error::Result;
use crate::module::Module;
use crate::nn::Linear;
use crate::tensor::Tensor;

/// Key-space width of the scoring network.
const KEY_DIM: usize = 32;

/// Dot-product attention over each node's sampled neighborhood.
pub struct AttentionAggregator {
    /// Shared key network: input -> KEY_DIM -> KEY_DIM, tanh between.
    key_fc1: Linear,
    key_fc2: Linear,
    fc_node: Linear,
    fc_neib: Linear,
    combine: Combine,
    activation: Option<Activation>,
    output_dim: usize,
}

impl AttentionAggregator {
    #[must_use]
    pub fn new(config: &AggregatorConfig) -> Self {
        let key_fc1 = Linear::without_bias(config.input_dim, KEY_DIM, config.seed);
        let key_fc2 = Linear::without_bias(KEY_DIM, KEY_DIM, config.seed.map(|s| s ^ 1));
        let fc_node = Linear::without_bias(
            config.input_dim,
            config.output_dim,
            config.seed.map(|s| s ^ 2),
        );
        let fc_neib = Linear::without_bias(
            config.input_dim,
            config.output_dim,
            config.seed.map(|s| s ^ 3),
        );
        let output_dim = config
            .combine
            .derive_output_dim(config.output_dim, config.output_dim);
        Self {
            key_fc1,
            key_fc2,
            fc_node,
            fc_neib,
            combine: config.combine,
            activation: config.activation,
            output_dim,
        }
    }

    fn keys(&self, x: &Tensor) -> Tensor {
        self.key_fc2.forward(&self.key_fc1.forward(x).tanh_act())
    }

    /// Softmax-normalized per-neighbor weights, flat in sampler order.
    ///
    /// Exposed so the weighting itself can be inspected and tested apart
    /// from the weighted sum.
    pub fn attention_weights(
        &self,
        node_repr: &Tensor,
        neib_repr: &Tensor,
    ) -> Result<Vec<f32>> {
        let n_samples = check_neighbor_block(node_repr, neib_repr)?;
        let batch = node_repr.n_rows();

        let node_keys = self.keys(node_repr);
        let neib_keys = self.keys(neib_repr);

        let mut scores = Vec::with_capacity(batch * n_samples);
        for b in 0..batch {
            let nk = node_keys.row(b);
            for s in 0..n_samples {
                let dot: f32 = nk
                    .iter()
                    .zip(neib_keys.row(b * n_samples + s))
                    .map(|(&a, &b)| a * b)
                    .sum();
                scores.push(dot);
            }
        }
        softmax_per_group(&mut scores, n_samples);
        Ok(scores)
    }
}

impl Aggregate for AttentionAggregator {
    fn forward(
        &self,
        node_repr: &Tensor,
        neib_repr: &Tensor,
        _node_ids: &[usize],
        _neib_ids: &[usize],
    ) -> Result<Tensor> {
        let n_samples = check_neighbor_block(node_repr, neib_repr)?;
        let batch = node_repr.n_rows();
        let dim = neib_repr.n_cols();

        let weights = self.attention_weights(node_repr, neib_repr)?;

        let mut data = vec![0.0f32; batch * dim];
        for b in 0..batch {
            let out = &mut data[b * dim..(b + 1) * dim];
            for s in 0..n_samples {
                let w = weights[b * n_samples + s];
                for (o, &v) in out.iter_mut().zip(neib_repr.row(b * n_samples + s)) {
                    *o += w * v;
                }
            }
        }
        let agg = Tensor::new(&data, &[batch, dim]);

        let combined = self
            .combine
            .apply(&self.fc_node.forward(node_repr), &self.fc_neib.forward(&agg));
        Ok(match &self.activation {
            Some(act) => act.apply(&combined),
            None => combined,
        })
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }
}

impl Module for AttentionAggregator {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.key_fc1.parameters();
        p.extend(self.key_fc2.parameters());
        p.extend(self.fc_node.parameters());
        p.extend(self.fc_neib.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.key_fc1.parameters_mut();
        p.extend(self.key_fc2.parameters_mut());
        p.extend(self.fc_node.parameters_mut());
        p.extend(self.fc_neib.parameters_mut());
        p
    }
}

impl std::fmt::Debug for AttentionAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttentionAggregator")
            .field("output_dim", &self.output_dim)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AggregatorConfig {
        AggregatorConfig::new(4, 6).with_seed(42)
    }

    #[test]
    fn test_attention_shapes() {
        let agg = AttentionAggregator::new(&config());
        assert_eq!(agg.output_dim(), 12);

        let node = Tensor::ones(&[2, 4]);
        let neib = Tensor::ones(&[8, 4]);
        let out = agg.forward(&node, &neib, &[0, 1], &[0; 8]).unwrap();
        assert_eq!(out.shape(), &[2, 12]);
    }

    #[test]
    fn test_weights_form_distribution() {
        let agg = AttentionAggregator::new(&config());
        let node = Tensor::new(&[0.3, -0.1, 0.8, 0.2, -0.5, 0.4, 0.1, 0.9], &[2, 4]);
        let data: Vec<f32> = (0..6 * 4).map(|i| (i as f32 * 0.31).sin()).collect();
        let neib = Tensor::new(&data, &[6, 4]);

        let weights = agg.attention_weights(&node, &neib).unwrap();
        assert_eq!(weights.len(), 6);
        for group in weights.chunks(3) {
            let sum: f32 = group.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert!(group.iter().all(|&w| w >= 0.0));
        }
    }

    #[test]
    fn test_identical_neighbors_weighted_uniformly() {
        let agg = AttentionAggregator::new(&config());
        let node = Tensor::ones(&[1, 4]);
        let neib = Tensor::new(&[0.5f32; 12], &[3, 4]);

        let weights = agg.attention_weights(&node, &neib).unwrap();
        for &w in &weights {
            assert!((w - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_weighted_sum_stays_in_hull() {
        // With identity fc_neib and no node branch contribution, the
        // neighborhood summary is a convex combination of the raw rows.
        let mut agg = AttentionAggregator::new(
            &AggregatorConfig::new(2, 2).with_seed(42).with_activation(None),
        );
        agg.fc_node.set_weight(Tensor::zeros(&[2, 2]));
        agg.fc_neib.set_weight(Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2]));

        let node = Tensor::new(&[0.2, -0.4], &[1, 2]);
        let neib = Tensor::new(&[1.0, 0.0, 3.0, 2.0], &[2, 2]);
        let out = agg.forward(&node, &neib, &[0], &[1, 2]).unwrap();

        // node branch zeroed; columns 2..4 hold the summary
        let x = out.data()[2];
        let y = out.data()[3];
        assert!((1.0..=3.0).contains(&x));
        assert!((0.0..=2.0).contains(&y));
    }
}
