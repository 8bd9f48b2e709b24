//! Neighborhood aggregators.
//!
//! An aggregator fuses a batch of node representations `(batch, input_dim)`
//! with the representations of their sampled neighbors, delivered flat as
//! `(batch * n_samples, input_dim)` in sampler order, into one output row
//! per node. Every variant first regroups the flat block to
//! `(batch, n_samples, input_dim)`, reduces over the sample axis, and then
//! mixes the reduced neighborhood with the node's own representation.
//!
//! # Reference
//!
//! Hamilton, W., Ying, R., & Leskovec, J. (2017). Inductive Representation
//! Learning on Large Graphs. NeurIPS.

mod attention;
mod mean;
mod pool;
mod recurrent;

pub use attention::AttentionAggregator;
pub use mean::{MeanAggregator, PSimpleMeanAggregator, SimpleMeanAggregator};
pub use pool::{PoolAggregator, PoolReduction};
pub use recurrent::LstmAggregator;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VecindarioError};
use crate::module::Module;
use crate::tensor::Tensor;

/// Common aggregator contract.
pub trait Aggregate: Module {
    /// Fuse node rows `(batch, input_dim)` with flat neighbor rows
    /// `(batch * n_samples, input_dim)` into `(batch, output_dim)` rows.
    ///
    /// `node_ids` and `neib_ids` carry the sampled graph ids in the same
    /// order as the representation rows; most variants ignore them.
    fn forward(
        &self,
        node_repr: &Tensor,
        neib_repr: &Tensor,
        node_ids: &[usize],
        neib_ids: &[usize],
    ) -> Result<Tensor>;

    /// Width of the fused rows, fixed at construction.
    fn output_dim(&self) -> usize;
}

/// How the node branch and the neighborhood branch are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combine {
    /// Column-wise concatenation (the default).
    Concat,
    /// Element-wise sum; both branches must share a width.
    Sum,
}

impl Combine {
    /// Merge two `(batch, d)` blocks.
    #[must_use]
    pub fn apply(&self, node: &Tensor, neib: &Tensor) -> Tensor {
        match self {
            Combine::Concat => Tensor::concat_cols(node, neib),
            Combine::Sum => node.add(neib),
        }
    }

    /// Output width for the given per-branch widths, measured once at
    /// construction by combining two zero rows.
    #[must_use]
    pub fn derive_output_dim(&self, node_dim: usize, neib_dim: usize) -> usize {
        let probe = self.apply(&Tensor::zeros(&[1, node_dim]), &Tensor::zeros(&[1, neib_dim]));
        probe.n_cols()
    }
}

/// Output non-linearity applied after the combine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    #[must_use]
    pub fn apply(&self, x: &Tensor) -> Tensor {
        match self {
            Activation::Relu => x.relu(),
            Activation::Tanh => x.tanh_act(),
            Activation::Sigmoid => x.sigmoid(),
        }
    }
}

/// Shared configuration for name-keyed aggregator construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Width of the incoming representation rows.
    pub input_dim: usize,
    /// Per-branch output width.
    pub output_dim: usize,
    /// Inner width of the pooling MLP and the recurrent variants.
    pub hidden_dim: usize,
    pub combine: Combine,
    pub activation: Option<Activation>,
    /// Run the recurrent variant in both directions.
    pub bidirectional: bool,
    /// Node count, needed only by the per-id-weighted variant.
    pub n_nodes: usize,
    /// Parameter-initialization seed.
    pub seed: Option<u64>,
}

impl AggregatorConfig {
    #[must_use]
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            hidden_dim: 512,
            combine: Combine::Concat,
            activation: Some(Activation::Relu),
            bidirectional: false,
            n_nodes: 0,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    #[must_use]
    pub fn with_combine(mut self, combine: Combine) -> Self {
        self.combine = combine;
        self
    }

    #[must_use]
    pub fn with_activation(mut self, activation: Option<Activation>) -> Self {
        self.activation = activation;
        self
    }

    #[must_use]
    pub fn with_bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    #[must_use]
    pub fn with_n_nodes(mut self, n_nodes: usize) -> Self {
        self.n_nodes = n_nodes;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Infer `n_samples` from a flat neighbor block, rejecting blocks whose row
/// count is not an exact multiple of the batch size or whose width differs
/// from the node rows.
pub(crate) fn check_neighbor_block(
    node_repr: &Tensor,
    neib_repr: &Tensor,
) -> Result<usize> {
    let batch = node_repr.n_rows();
    if neib_repr.n_cols() != node_repr.n_cols() {
        return Err(VecindarioError::ShapeMismatch {
            expected: format!("neighbor rows {} wide", node_repr.n_cols()),
            actual: format!("neighbor rows {} wide", neib_repr.n_cols()),
        });
    }
    let flat_rows = neib_repr.n_rows();
    if batch == 0 || flat_rows == 0 || flat_rows % batch != 0 {
        return Err(VecindarioError::InvalidArgument {
            param: "neib_repr".to_string(),
            value: format!("{flat_rows} rows"),
            constraint: format!("a non-zero multiple of the batch size {batch}"),
        });
    }
    Ok(flat_rows / batch)
}

/// Mean over each node's group of `n_samples` contiguous neighbor rows.
pub(crate) fn group_mean(neib_repr: &Tensor, batch: usize, n_samples: usize) -> Tensor {
    let dim = neib_repr.n_cols();
    let mut data = vec![0.0f32; batch * dim];
    for b in 0..batch {
        let out = &mut data[b * dim..(b + 1) * dim];
        for s in 0..n_samples {
            for (o, &v) in out.iter_mut().zip(neib_repr.row(b * n_samples + s)) {
                *o += v;
            }
        }
        for o in out.iter_mut() {
            *o /= n_samples as f32;
        }
    }
    Tensor::new(&data, &[batch, dim])
}

/// Column-wise max over each node's group of `n_samples` neighbor rows.
pub(crate) fn group_max(neib_repr: &Tensor, batch: usize, n_samples: usize) -> Tensor {
    let dim = neib_repr.n_cols();
    let mut data = vec![f32::NEG_INFINITY; batch * dim];
    for b in 0..batch {
        let out = &mut data[b * dim..(b + 1) * dim];
        for s in 0..n_samples {
            for (o, &v) in out.iter_mut().zip(neib_repr.row(b * n_samples + s)) {
                if v > *o {
                    *o = v;
                }
            }
        }
    }
    Tensor::new(&data, &[batch, dim])
}

/// In-place softmax over each contiguous group of `n_samples` scores.
pub(crate) fn softmax_per_group(scores: &mut [f32], n_samples: usize) {
    for group in scores.chunks_mut(n_samples) {
        let max = group.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0f32;
        for v in group.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        for v in group.iter_mut() {
            *v /= sum;
        }
    }
}

/// The closed set of aggregation strategies, selected by configuration name.
#[derive(Debug)]
pub enum Aggregator {
    Mean(MeanAggregator),
    SimpleMean(SimpleMeanAggregator),
    PSimpleMean(PSimpleMeanAggregator),
    Pool(PoolAggregator),
    Lstm(LstmAggregator),
    Attention(AttentionAggregator),
}

impl Aggregator {
    /// Construct an aggregator by name from a shared config.
    pub fn from_name(name: &str, config: &AggregatorConfig) -> Result<Self> {
        match name {
            "mean" => Ok(Aggregator::Mean(MeanAggregator::new(config))),
            "simple_mean" => Ok(Aggregator::SimpleMean(SimpleMeanAggregator::new(config))),
            "psimple_mean" => Ok(Aggregator::PSimpleMean(PSimpleMeanAggregator::new(config)?)),
            "max_pool" => Ok(Aggregator::Pool(PoolAggregator::new(
                config,
                PoolReduction::Max,
            ))),
            "mean_pool" => Ok(Aggregator::Pool(PoolAggregator::new(
                config,
                PoolReduction::Mean,
            ))),
            "lstm" => Ok(Aggregator::Lstm(LstmAggregator::new(config)?)),
            "attention" => Ok(Aggregator::Attention(AttentionAggregator::new(config))),
            other => Err(VecindarioError::InvalidArgument {
                param: "name".to_string(),
                value: other.to_string(),
                constraint:
                    "one of: mean, simple_mean, psimple_mean, max_pool, mean_pool, lstm, attention"
                        .to_string(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Aggregator::Mean(_) => "mean",
            Aggregator::SimpleMean(_) => "simple_mean",
            Aggregator::PSimpleMean(_) => "psimple_mean",
            Aggregator::Pool(agg) => match agg.reduction() {
                PoolReduction::Max => "max_pool",
                PoolReduction::Mean => "mean_pool",
            },
            Aggregator::Lstm(_) => "lstm",
            Aggregator::Attention(_) => "attention",
        }
    }
}

impl Aggregate for Aggregator {
    fn forward(
        &self,
        node_repr: &Tensor,
        neib_repr: &Tensor,
        node_ids: &[usize],
        neib_ids: &[usize],
    ) -> Result<Tensor> {
        match self {
            Aggregator::Mean(a) => a.forward(node_repr, neib_repr, node_ids, neib_ids),
            Aggregator::SimpleMean(a) => a.forward(node_repr, neib_repr, node_ids, neib_ids),
            Aggregator::PSimpleMean(a) => a.forward(node_repr, neib_repr, node_ids, neib_ids),
            Aggregator::Pool(a) => a.forward(node_repr, neib_repr, node_ids, neib_ids),
            Aggregator::Lstm(a) => a.forward(node_repr, neib_repr, node_ids, neib_ids),
            Aggregator::Attention(a) => a.forward(node_repr, neib_repr, node_ids, neib_ids),
        }
    }

    fn output_dim(&self) -> usize {
        match self {
            Aggregator::Mean(a) => a.output_dim(),
            Aggregator::SimpleMean(a) => a.output_dim(),
            Aggregator::PSimpleMean(a) => a.output_dim(),
            Aggregator::Pool(a) => a.output_dim(),
            Aggregator::Lstm(a) => a.output_dim(),
            Aggregator::Attention(a) => a.output_dim(),
        }
    }
}

impl Module for Aggregator {
    fn parameters(&self) -> Vec<&Tensor> {
        match self {
            Aggregator::Mean(a) => a.parameters(),
            Aggregator::SimpleMean(a) => a.parameters(),
            Aggregator::PSimpleMean(a) => a.parameters(),
            Aggregator::Pool(a) => a.parameters(),
            Aggregator::Lstm(a) => a.parameters(),
            Aggregator::Attention(a) => a.parameters(),
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match self {
            Aggregator::Mean(a) => a.parameters_mut(),
            Aggregator::SimpleMean(a) => a.parameters_mut(),
            Aggregator::PSimpleMean(a) => a.parameters_mut(),
            Aggregator::Pool(a) => a.parameters_mut(),
            Aggregator::Lstm(a) => a.parameters_mut(),
            Aggregator::Attention(a) => a.parameters_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(rows: usize, cols: usize) -> Tensor {
        let data: Vec<f32> = (0..rows * cols).map(|i| (i as f32 * 0.37).cos()).collect();
        Tensor::new(&data, &[rows, cols])
    }

    #[test]
    fn test_combine_widths() {
        assert_eq!(Combine::Concat.derive_output_dim(8, 8), 16);
        assert_eq!(Combine::Sum.derive_output_dim(8, 8), 8);
    }

    #[test]
    fn test_group_mean() {
        // 2 nodes x 2 samples, dim 2
        let neib = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 10.0, 0.0, 20.0, 0.0], &[4, 2]);
        let m = group_mean(&neib, 2, 2);
        assert_eq!(m.data(), &[2.0, 3.0, 15.0, 0.0]);
    }

    #[test]
    fn test_group_max() {
        let neib = Tensor::new(&[1.0, 2.0, 3.0, -4.0, 10.0, 0.0, 20.0, 5.0], &[4, 2]);
        let m = group_max(&neib, 2, 2);
        assert_eq!(m.data(), &[3.0, 2.0, 20.0, 5.0]);
    }

    #[test]
    fn test_softmax_per_group_sums_to_one() {
        let mut scores = vec![1.0, 2.0, 3.0, -1.0, 0.0, 1.0];
        softmax_per_group(&mut scores, 3);
        let s1: f32 = scores[..3].iter().sum();
        let s2: f32 = scores[3..].iter().sum();
        assert!((s1 - 1.0).abs() < 1e-6);
        assert!((s2 - 1.0).abs() < 1e-6);
        assert!(scores[2] > scores[1] && scores[1] > scores[0]);
    }

    #[test]
    fn test_check_neighbor_block_divisibility() {
        let node = block(3, 4);
        let good = block(6, 4);
        assert_eq!(check_neighbor_block(&node, &good).unwrap(), 2);

        let ragged = block(7, 4);
        let err = check_neighbor_block(&node, &ragged).unwrap_err();
        assert!(matches!(err, VecindarioError::InvalidArgument { .. }));

        let narrow = block(6, 3);
        let err = check_neighbor_block(&node, &narrow).unwrap_err();
        assert!(matches!(err, VecindarioError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_neighbor_block_rejected_before_numeric_work() {
        // Zero neighbor rows divide evenly into any batch but leave no
        // samples to reduce over; every variant must refuse up front
        // instead of emitting NaN rows or panicking mid-reduction.
        let node = block(2, 4);
        let empty = Tensor::zeros(&[0, 4]);
        let err = check_neighbor_block(&node, &empty).unwrap_err();
        assert!(matches!(err, VecindarioError::InvalidArgument { .. }));

        let config = AggregatorConfig::new(4, 6)
            .with_seed(42)
            .with_hidden_dim(8)
            .with_n_nodes(10);
        for name in [
            "mean",
            "simple_mean",
            "psimple_mean",
            "max_pool",
            "mean_pool",
            "lstm",
            "attention",
        ] {
            let agg = Aggregator::from_name(name, &config).unwrap();
            let err = agg.forward(&node, &empty, &[0, 1], &[]).unwrap_err();
            assert!(
                matches!(err, VecindarioError::InvalidArgument { .. }),
                "empty block for {name}"
            );
        }
    }

    #[test]
    fn test_from_name_all_variants() {
        let config = AggregatorConfig::new(8, 16)
            .with_seed(42)
            .with_hidden_dim(12)
            .with_n_nodes(40);
        for name in [
            "mean",
            "simple_mean",
            "psimple_mean",
            "max_pool",
            "mean_pool",
            "lstm",
            "attention",
        ] {
            let agg = Aggregator::from_name(name, &config).unwrap();
            assert_eq!(agg.name(), name);
            assert!(agg.output_dim() > 0, "output width for {name}");
        }

        let err = Aggregator::from_name("median", &config).unwrap_err();
        assert!(matches!(err, VecindarioError::InvalidArgument { .. }));
    }

    #[test]
    fn test_every_aggregator_width_matches_declaration() {
        let config = AggregatorConfig::new(8, 16)
            .with_seed(7)
            .with_hidden_dim(12)
            .with_n_nodes(40);
        let node = block(3, 8);
        let neib = block(6, 8);
        let node_ids = [0, 1, 2];
        let neib_ids = [3, 4, 5, 6, 7, 8];

        for name in [
            "mean",
            "simple_mean",
            "psimple_mean",
            "max_pool",
            "mean_pool",
            "lstm",
            "attention",
        ] {
            let agg = Aggregator::from_name(name, &config).unwrap();
            let out = agg.forward(&node, &neib, &node_ids, &neib_ids).unwrap();
            assert_eq!(out.shape(), &[3, agg.output_dim()], "width for {name}");
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Mean and pool reductions must not care about sample order.
            #[test]
            fn order_invariant_reductions(
                values in proptest::collection::vec(-10.0f32..10.0, 12),
                rotate in 0usize..4,
            ) {
                let neib = Tensor::new(&values, &[4, 3]);
                let mut rotated_rows: Vec<Vec<f32>> =
                    (0..4).map(|i| neib.row(i).to_vec()).collect();
                rotated_rows.rotate_left(rotate);
                let flat: Vec<f32> = rotated_rows.concat();
                let shuffled = Tensor::new(&flat, &[4, 3]);

                let a = group_mean(&neib, 1, 4);
                let b = group_mean(&shuffled, 1, 4);
                for (x, y) in a.data().iter().zip(b.data()) {
                    prop_assert!((x - y).abs() < 1e-4);
                }

                let a = group_max(&neib, 1, 4);
                let b = group_max(&shuffled, 1, 4);
                prop_assert_eq!(a.data(), b.data());
            }

            /// Softmax groups always form a probability distribution.
            #[test]
            fn softmax_groups_normalized(
                scores in proptest::collection::vec(-20.0f32..20.0, 9),
            ) {
                let mut scores = scores;
                softmax_per_group(&mut scores, 3);
                for group in scores.chunks(3) {
                    let sum: f32 = group.iter().sum();
                    prop_assert!((sum - 1.0).abs() < 1e-4);
                    prop_assert!(group.iter().all(|&w| w >= 0.0));
                }
            }
        }
    }

    #[test]
    fn test_sum_combine_narrows_output() {
        let config = AggregatorConfig::new(8, 16)
            .with_seed(42)
            .with_combine(Combine::Sum);
        let concat = MeanAggregator::new(&AggregatorConfig::new(8, 16).with_seed(42));
        let summed = MeanAggregator::new(&config);
        assert_eq!(concat.output_dim(), 32);
        assert_eq!(summed.output_dim(), 16);
    }
}
