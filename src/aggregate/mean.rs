//! Mean-family aggregators.

use super::{
    check_neighbor_block, group_mean, Activation, Aggregate, AggregatorConfig, Combine,
};
use crate::error::{Result, VecindarioError};
use crate::module::Module;
use crate::nn::{Embedding, Linear};
use crate::tensor::Tensor;

/// Projects the node row and the neighborhood mean through separate
/// bias-free transforms before combining them.
pub struct MeanAggregator {
    fc_node: Linear,
    fc_neib: Linear,
    combine: Combine,
    activation: Option<Activation>,
    output_dim: usize,
}

impl MeanAggregator {
    #[must_use]
    pub fn new(config: &AggregatorConfig) -> Self {
        let fc_node = Linear::without_bias(config.input_dim, config.output_dim, config.seed);
        let fc_neib = Linear::without_bias(
            config.input_dim,
            config.output_dim,
            config.seed.map(|s| s ^ 1),
        );
        let output_dim = config
            .combine
            .derive_output_dim(config.output_dim, config.output_dim);
        Self {
            fc_node,
            fc_neib,
            combine: config.combine,
            activation: config.activation,
            output_dim,
        }
    }
}

impl Aggregate for MeanAggregator {
    fn forward(
        &self,
        node_repr: &Tensor,
        neib_repr: &Tensor,
        _node_ids: &[usize],
        _neib_ids: &[usize],
    ) -> Result<Tensor> {
        let n_samples = check_neighbor_block(node_repr, neib_repr)?;
        let agg = group_mean(neib_repr, node_repr.n_rows(), n_samples);

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

impl Module for MeanAggregator {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.fc_node.parameters();
        p.extend(self.fc_neib.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.fc_node.parameters_mut();
        p.extend(self.fc_neib.parameters_mut());
        p
    }
}

impl std::fmt::Debug for MeanAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeanAggregator")
            .field("combine", &self.combine)
            .field("output_dim", &self.output_dim)
            .finish_non_exhaustive()
    }
}

/// Single biased transform of the neighborhood mean; the node's own row is
/// deliberately left out of the output.
pub struct SimpleMeanAggregator {
    fc_neib: Linear,
    activation: Option<Activation>,
}

impl SimpleMeanAggregator {
    #[must_use]
    pub fn new(config: &AggregatorConfig) -> Self {
        Self {
            fc_neib: Linear::new(config.input_dim, config.output_dim, config.seed),
            activation: config.activation,
        }
    }
}

impl Aggregate for SimpleMeanAggregator {
    fn forward(
        &self,
        node_repr: &Tensor,
        neib_repr: &Tensor,
        _node_ids: &[usize],
        _neib_ids: &[usize],
    ) -> Result<Tensor> {
        let n_samples = check_neighbor_block(node_repr, neib_repr)?;
        let agg = group_mean(neib_repr, node_repr.n_rows(), n_samples);

        let out = self.fc_neib.forward(&agg);
        Ok(match &self.activation {
            Some(act) => act.apply(&out),
            None => out,
        })
    }

    fn output_dim(&self) -> usize {
        self.fc_neib.out_features()
    }
}

impl Module for SimpleMeanAggregator {
    fn parameters(&self) -> Vec<&Tensor> {
        self.fc_neib.parameters()
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.fc_neib.parameters_mut()
    }
}

impl std::fmt::Debug for SimpleMeanAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleMeanAggregator")
            .field("output_dim", &self.fc_neib.out_features())
            .finish_non_exhaustive()
    }
}

/// [`SimpleMeanAggregator`] with a learned scalar weight per neighbor id:
/// the weights of each node's sampled neighbors are softmax-normalized, so
/// the neighborhood reduction is a learned convex combination instead of a
/// uniform mean.
pub struct PSimpleMeanAggregator {
    fc_neib: Linear,
    /// One scalar per node id, plus the sentinel slot.
    neib_weights: Embedding,
    activation: Option<Activation>,
}

impl PSimpleMeanAggregator {
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        if config.n_nodes == 0 {
            return Err(VecindarioError::Configuration {
                message: "psimple_mean needs n_nodes to size its per-id weight table".to_string(),
            });
        }
        Ok(Self {
            fc_neib: Linear::new(config.input_dim, config.output_dim, config.seed),
            neib_weights: Embedding::new(config.n_nodes + 1, 1, config.seed.map(|s| s ^ 1)),
            activation: config.activation,
        })
    }
}

impl Aggregate for PSimpleMeanAggregator {
    fn forward(
        &self,
        node_repr: &Tensor,
        neib_repr: &Tensor,
        _node_ids: &[usize],
        neib_ids: &[usize],
    ) -> Result<Tensor> {
        let n_samples = check_neighbor_block(node_repr, neib_repr)?;
        let batch = node_repr.n_rows();
        if neib_ids.len() != neib_repr.n_rows() {
            return Err(VecindarioError::ShapeMismatch {
                expected: format!("{} neighbor ids", neib_repr.n_rows()),
                actual: format!("{} neighbor ids", neib_ids.len()),
            });
        }

        let mut weights: Vec<f32> = self.neib_weights.forward(neib_ids).data().to_vec();
        super::softmax_per_group(&mut weights, n_samples);

        let dim = neib_repr.n_cols();
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

        let out = self.fc_neib.forward(&agg);
        Ok(match &self.activation {
            Some(act) => act.apply(&out),
            None => out,
        })
    }

    fn output_dim(&self) -> usize {
        self.fc_neib.out_features()
    }
}

impl Module for PSimpleMeanAggregator {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.fc_neib.parameters();
        p.extend(self.neib_weights.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.fc_neib.parameters_mut();
        p.extend(self.neib_weights.parameters_mut());
        p
    }
}

impl std::fmt::Debug for PSimpleMeanAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PSimpleMeanAggregator")
            .field("output_dim", &self.fc_neib.out_features())
            .finish_non_exhaustive()
    }
}
