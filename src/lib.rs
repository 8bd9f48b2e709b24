//! Vecindario: sampled neighborhood aggregation for inductive graph
//! embeddings, in pure Rust.
//!
//! An embedding layer over a large graph is assembled from three pluggable
//! component families:
//!
//! 1. a [`sampler`] draws a fixed number of neighbor ids per node from a
//!    dense or compressed adjacency structure;
//! 2. a [`prep`] preprocessor turns raw node attributes (and optionally a
//!    learned per-node embedding) into fixed-width vectors;
//! 3. an [`aggregate`] aggregator fuses each node's vector with its sampled
//!    neighborhood into one output row per node.
//!
//! Stacking the flow twice gives every output row a two-hop receptive field
//! while touching only the sampled subgraph, so the cost per node is fixed
//! regardless of graph size and unseen nodes embed without retraining.
//!
//! # Quick Start
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use vecindario::adjacency::DenseAdjacency;
//! use vecindario::aggregate::{Aggregate, Aggregator, AggregatorConfig};
//! use vecindario::prep::{Prep, PrepConfig, Preprocess};
//! use vecindario::sampler::{NeighborSample, Sampler};
//! use vecindario::Tensor;
//!
//! let adj = DenseAdjacency::from_rows(&[
//!     vec![1, 2],
//!     vec![0, 2],
//!     vec![0, 1],
//! ]).unwrap();
//! let feats = Tensor::new(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], &[3, 2]);
//!
//! let sampler = Sampler::from_name("uniform", adj.into()).unwrap();
//! let prep = Prep::from_name("linear", &PrepConfig::new(2, 3).with_seed(7)).unwrap();
//! let agg = Aggregator::from_name(
//!     "mean",
//!     &AggregatorConfig::new(prep.output_dim(), 16).with_seed(7),
//! ).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let ids = [0usize, 1];
//! let neib_ids = sampler.sample(&mut rng, &ids, 2).unwrap();
//!
//! let gather = |ids: &[usize]| {
//!     let mut rows = Vec::new();
//!     for &i in ids {
//!         rows.extend_from_slice(feats.row(i));
//!     }
//!     Tensor::new(&rows, &[ids.len(), 2])
//! };
//!
//! let node_repr = prep.forward(&ids, &gather(&ids), 0).unwrap();
//! let neib_repr = prep.forward(&neib_ids, &gather(&neib_ids), 1).unwrap();
//! let out = agg.forward(&node_repr, &neib_repr, &ids, &neib_ids).unwrap();
//! assert_eq!(out.shape(), &[2, agg.output_dim()]);
//! ```
//!
//! # Modules
//!
//! - [`tensor`]: Dense row-major f32 tensor
//! - [`error`]: Crate error type and `Result` alias
//! - [`module`]: Parameter-surface trait shared by trainable components
//! - [`init`]: Weight initialization (Xavier, normal, uniform)
//! - [`nn`]: Trainable building blocks (Linear, Embedding, LSTM)
//! - [`adjacency`]: Dense and compressed-row graph storage
//! - [`sampler`]: Uniform neighbor samplers over both layouts
//! - [`prep`]: Feature preprocessors (identity through geo bag-of-words)
//! - [`aggregate`]: Neighborhood aggregators (mean family, pooling, LSTM,
//!   attention)
//!
//! # References
//!
//! Hamilton, W., Ying, R., & Leskovec, J. (2017). Inductive Representation
//! Learning on Large Graphs. NeurIPS.

pub mod adjacency;
pub mod aggregate;
pub mod error;
pub mod init;
pub mod module;
pub mod nn;
pub mod prep;
pub mod sampler;
pub mod tensor;

pub use error::{Result, VecindarioError};
pub use module::Module;
pub use tensor::Tensor;
