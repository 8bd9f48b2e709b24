//! Recurrent aggregator: reads each node's sampled neighbors as a sequence.
//!
//! The reduction is order-sensitive by construction even though the sampler
//! imposes no meaningful order on the samples; randomizing the sample order
//! between passes acts as a symmetrization in practice.

use super::{check_neighbor_block, Activation, Aggregate, AggregatorConfig, Combine};
use crate::error::{Result, VecindarioError};
use crate::module::Module;
use crate::nn::{Bidirectional, Linear, Lstm};
use crate::tensor::Tensor;

enum Rnn {
    Uni(Lstm),
    Bi(Bidirectional),
}

/// Runs an LSTM over each node's neighbor sequence and combines the final
/// step's hidden state with the projected node row.
///
/// In bidirectional mode the per-direction hidden width is halved so the
/// concatenated summary keeps the configured `hidden_dim`.
pub struct LstmAggregator {
    rnn: Rnn,
    fc_node: Linear,
    fc_neib: Linear,
    combine: Combine,
    activation: Option<Activation>,
    output_dim: usize,
}

impl LstmAggregator {
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        let rnn = if config.bidirectional {
            if config.hidden_dim % 2 != 0 {
                return Err(VecindarioError::Configuration {
                    message: format!(
                        "bidirectional lstm needs an even hidden_dim so the two directions split it equally (got {})",
                        config.hidden_dim
                    ),
                });
            }
            Rnn::Bi(Bidirectional::new(
                config.input_dim,
                config.hidden_dim / 2,
                config.seed,
            ))
        } else {
            Rnn::Uni(Lstm::new(config.input_dim, config.hidden_dim, config.seed))
        };

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

        Ok(Self {
            rnn,
            fc_node,
            fc_neib,
            combine: config.combine,
            activation: config.activation,
            output_dim,
        })
    }

    /// Summary of the last timestep, `(batch, hidden_dim)`.
    fn summarize(&self, seq: &Tensor) -> Tensor {
        match &self.rnn {
            Rnn::Uni(lstm) => {
                let (_, h_final) = lstm.forward_sequence(seq);
                h_final
            }
            Rnn::Bi(bi) => {
                let out = bi.forward_sequence(seq);
                last_timestep(&out)
            }
        }
    }
}

impl Aggregate for LstmAggregator {
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

        let seq = neib_repr.view(&[batch, n_samples, dim]);
        let agg = self.summarize(&seq);

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

impl Module for LstmAggregator {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = match &self.rnn {
            Rnn::Uni(lstm) => lstm.parameters(),
            Rnn::Bi(bi) => bi.parameters(),
        };
        p.extend(self.fc_node.parameters());
        p.extend(self.fc_neib.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = match &mut self.rnn {
            Rnn::Uni(lstm) => lstm.parameters_mut(),
            Rnn::Bi(bi) => bi.parameters_mut(),
        };
        p.extend(self.fc_node.parameters_mut());
        p.extend(self.fc_neib.parameters_mut());
        p
    }
}

impl std::fmt::Debug for LstmAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LstmAggregator")
            .field("bidirectional", &matches!(self.rnn, Rnn::Bi(_)))
            .field("output_dim", &self.output_dim)
            .finish_non_exhaustive()
    }
}

/// Take the last timestep of a `(batch, seq, features)` tensor.
fn last_timestep(x: &Tensor) -> Tensor {
    let (batch, seq_len, features) = (x.shape()[0], x.shape()[1], x.shape()[2]);
    let mut data = Vec::with_capacity(batch * features);
    for b in 0..batch {
        let start = b * seq_len * features + (seq_len - 1) * features;
        data.extend_from_slice(&x.data()[start..start + features]);
    }
    Tensor::new(&data, &[batch, features])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AggregatorConfig {
        AggregatorConfig::new(4, 6).with_seed(42).with_hidden_dim(8)
    }

    #[test]
    fn test_lstm_aggregator_shapes() {
        let agg = LstmAggregator::new(&config()).unwrap();
        assert_eq!(agg.output_dim(), 12);

        let node = Tensor::ones(&[2, 4]);
        let neib = Tensor::ones(&[6, 4]);
        let out = agg.forward(&node, &neib, &[0, 1], &[0; 6]).unwrap();
        assert_eq!(out.shape(), &[2, 12]);
    }

    #[test]
    fn test_bidirectional_keeps_width() {
        let agg = LstmAggregator::new(&config().with_bidirectional(true)).unwrap();
        let node = Tensor::ones(&[2, 4]);
        let neib = Tensor::ones(&[6, 4]);
        let out = agg.forward(&node, &neib, &[0, 1], &[0; 6]).unwrap();
        assert_eq!(out.shape(), &[2, agg.output_dim()]);
    }

    #[test]
    fn test_bidirectional_odd_hidden_rejected() {
        // A wiring problem caught at construction, so it reports as a
        // configuration error, not a call-argument one.
        let err = LstmAggregator::new(
            &config().with_hidden_dim(7).with_bidirectional(true),
        )
        .unwrap_err();
        assert!(matches!(err, VecindarioError::Configuration { .. }));
    }

    #[test]
    fn test_order_sensitive() {
        let agg = LstmAggregator::new(&config().with_activation(None)).unwrap();
        let node = Tensor::zeros(&[1, 4]);

        let fwd = Tensor::new(
            &[1.0, 2.0, 3.0, 4.0, -4.0, -3.0, -2.0, -1.0],
            &[2, 4],
        );
        let rev = Tensor::new(
            &[-4.0, -3.0, -2.0, -1.0, 1.0, 2.0, 3.0, 4.0],
            &[2, 4],
        );

        let a = agg.forward(&node, &fwd, &[0], &[1, 2]).unwrap();
        let b = agg.forward(&node, &rev, &[0], &[2, 1]).unwrap();
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn test_last_timestep() {
        let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 3, 2]);
        let last = last_timestep(&x);
        assert_eq!(last.data(), &[5.0, 6.0]);
    }
}
