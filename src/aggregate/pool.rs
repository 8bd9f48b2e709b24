//! Pooling aggregator: a shared MLP lifts each neighbor row into a hidden
//! space, an order-invariant reduction collapses the sample axis, and the
//! result is combined with the projected node row.

use serde::{Deserialize, Serialize};

use super::{
    check_neighbor_block, group_max, group_mean, Activation, Aggregate, AggregatorConfig, Combine,
};
use crate::error::Result;
use crate::module::Module;
use crate::nn::Linear;
use crate::tensor::Tensor;

/// Reduction applied over each node's lifted neighbor rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolReduction {
    /// Element-wise max.
    Max,
    /// Element-wise mean.
    Mean,
}

/// Max- or mean-pooling over an MLP-lifted neighborhood.
pub struct PoolAggregator {
    /// Shared per-neighbor lift `[input_dim -> hidden_dim]`, ReLU-activated.
    mlp: Linear,
    fc_node: Linear,
    fc_neib: Linear,
    reduction: PoolReduction,
    combine: Combine,
    activation: Option<Activation>,
    output_dim: usize,
}

impl PoolAggregator {
    #[must_use]
    pub fn new(config: &AggregatorConfig, reduction: PoolReduction) -> Self {
        let mlp = Linear::new(config.input_dim, config.hidden_dim, config.seed);
        let fc_node = Linear::without_bias(
            config.input_dim,
            config.output_dim,
            config.seed.map(|s| s ^ 1),
        );
        let fc_neib = Linear::without_bias(
            config.hidden_dim,
            config.output_dim,
            config.seed.map(|s| s ^ 2),
        );
        let output_dim = config
            .combine
            .derive_output_dim(config.output_dim, config.output_dim);
        Self {
            mlp,
            fc_node,
            fc_neib,
            reduction,
            combine: config.combine,
            activation: config.activation,
            output_dim,
        }
    }

    #[must_use]
    pub fn reduction(&self) -> PoolReduction {
        self.reduction
    }
}

impl Aggregate for PoolAggregator {
    fn forward(
        &self,
        node_repr: &Tensor,
        neib_repr: &Tensor,
        _node_ids: &[usize],
        _neib_ids: &[usize],
    ) -> Result<Tensor> {
        let n_samples = check_neighbor_block(node_repr, neib_repr)?;
        let batch = node_repr.n_rows();

        let lifted = self.mlp.forward(neib_repr).relu();
        let agg = match self.reduction {
            PoolReduction::Max => group_max(&lifted, batch, n_samples),
            PoolReduction::Mean => group_mean(&lifted, batch, n_samples),
        };

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

impl Module for PoolAggregator {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.mlp.parameters();
        p.extend(self.fc_node.parameters());
        p.extend(self.fc_neib.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.mlp.parameters_mut();
        p.extend(self.fc_node.parameters_mut());
        p.extend(self.fc_neib.parameters_mut());
        p
    }
}

impl std::fmt::Debug for PoolAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolAggregator")
            .field("reduction", &self.reduction)
            .field("output_dim", &self.output_dim)
            .finish_non_exhaustive()
    }
}
