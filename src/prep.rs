//! Feature preprocessors.
//!
//! A preprocessor turns a node's raw stored attributes (and, for some
//! variants, a learned per-node embedding) into the fixed-width vector the
//! first aggregation layer consumes. Each variant declares its own
//! `output_dim`; the aggregator wired after it must be constructed with a
//! matching `input_dim`.
//!
//! # The sentinel rule
//!
//! Variants that look up a per-node embedding size their table `n_nodes + 1`
//! and reserve id `n_nodes` as a sentinel. At the outermost layer
//! (`layer_idx == 0`) the sentinel row is looked up instead of each node's
//! own id: the seed nodes of a forward pass are exactly the prediction
//! targets, and handing them their own trainable embedding during training
//! lets the model memorize answers instead of generalizing. Deeper layers
//! (`layer_idx > 0`, i.e. neighbors) use the true id. The sentinel is never
//! a valid index into the external feature table.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VecindarioError};
use crate::module::Module;
use crate::nn::{Embedding, Linear};
use crate::tensor::Tensor;

/// Common preprocessor contract.
pub trait Preprocess: Module {
    /// Produce one `output_dim`-wide row per id.
    fn forward(&self, ids: &[usize], feats: &Tensor, layer_idx: usize) -> Result<Tensor>;

    /// Width of the produced rows, fixed at construction.
    fn output_dim(&self) -> usize;
}

/// Shared configuration for name-keyed preprocessor construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    /// Width of the raw feature rows (0 if the graph has no features).
    pub input_dim: usize,
    /// Number of real nodes; embedding tables add one sentinel slot.
    pub n_nodes: usize,
    /// Per-branch output width of the transforming variants.
    pub output_dim: usize,
    /// Width of learned embedding rows.
    pub embedding_dim: usize,
    /// Token-embedding table size for the bag-of-words variants.
    pub vocab_size: usize,
    /// Trailing categorical columns for the geo variant.
    pub n_cat: usize,
    /// Parameter-initialization seed.
    pub seed: Option<u64>,
}

impl PrepConfig {
    #[must_use]
    pub fn new(input_dim: usize, n_nodes: usize) -> Self {
        Self {
            input_dim,
            n_nodes,
            output_dim: 32,
            embedding_dim: 32,
            vocab_size: 15_000,
            n_cat: 28,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_output_dim(mut self, output_dim: usize) -> Self {
        self.output_dim = output_dim;
        self
    }

    #[must_use]
    pub fn with_embedding_dim(mut self, embedding_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self
    }

    #[must_use]
    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = vocab_size;
        self
    }

    #[must_use]
    pub fn with_n_cat(mut self, n_cat: usize) -> Self {
        self.n_cat = n_cat;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Reject feature blocks whose width disagrees with the configured one.
fn check_feat_width(input_dim: usize, feats: &Tensor) -> Result<()> {
    if feats.shape().len() != 2 || feats.n_cols() != input_dim {
        return Err(VecindarioError::ShapeMismatch {
            expected: format!("(batch, {input_dim}) feature tensor"),
            actual: format!("{:?}", feats.shape()),
        });
    }
    Ok(())
}

/// Passes raw features through untouched.
#[derive(Debug, Clone)]
pub struct IdentityPrep {
    input_dim: usize,
}

impl IdentityPrep {
    #[must_use]
    pub fn new(input_dim: usize) -> Self {
        Self { input_dim }
    }
}

impl Preprocess for IdentityPrep {
    fn forward(&self, _ids: &[usize], feats: &Tensor, _layer_idx: usize) -> Result<Tensor> {
        check_feat_width(self.input_dim, feats)?;
        Ok(feats.clone())
    }

    fn output_dim(&self) -> usize {
        self.input_dim
    }
}

impl Module for IdentityPrep {
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }
}

/// Concatenates a learned, affine-transformed per-node embedding onto the
/// raw features (or replaces them when the graph has none).
pub struct NodeEmbeddingPrep {
    input_dim: usize,
    n_nodes: usize,
    embedding_dim: usize,
    embedding: Embedding,
    /// Affine transform, for changing scale and location of the lookup.
    fc: Linear,
}

impl NodeEmbeddingPrep {
    #[must_use]
    pub fn new(input_dim: usize, n_nodes: usize, embedding_dim: usize, seed: Option<u64>) -> Self {
        Self {
            input_dim,
            n_nodes,
            embedding_dim,
            embedding: Embedding::new(n_nodes + 1, embedding_dim, seed),
            fc: Linear::new(embedding_dim, embedding_dim, seed),
        }
    }

    /// The reserved sentinel id (one past the last real node).
    #[must_use]
    pub fn sentinel(&self) -> usize {
        self.n_nodes
    }

    fn lookup_ids(&self, ids: &[usize], layer_idx: usize) -> Vec<usize> {
        if layer_idx > 0 {
            ids.to_vec()
        } else {
            vec![self.n_nodes; ids.len()]
        }
    }
}

impl Preprocess for NodeEmbeddingPrep {
    fn forward(&self, ids: &[usize], feats: &Tensor, layer_idx: usize) -> Result<Tensor> {
        let embs = self.fc.forward(&self.embedding.forward(&self.lookup_ids(ids, layer_idx)));

        if self.input_dim > 0 {
            check_feat_width(self.input_dim, feats)?;
            if feats.n_rows() != ids.len() {
                return Err(VecindarioError::ShapeMismatch {
                    expected: format!("{} feature rows", ids.len()),
                    actual: format!("{} feature rows", feats.n_rows()),
                });
            }
            Ok(Tensor::concat_cols(feats, &embs))
        } else {
            Ok(embs)
        }
    }

    fn output_dim(&self) -> usize {
        if self.input_dim > 0 {
            self.input_dim + self.embedding_dim
        } else {
            self.embedding_dim
        }
    }
}

impl Module for NodeEmbeddingPrep {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.embedding.parameters();
        p.extend(self.fc.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.embedding.parameters_mut();
        p.extend(self.fc.parameters_mut());
        p
    }
}

impl std::fmt::Debug for NodeEmbeddingPrep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeEmbeddingPrep")
            .field("input_dim", &self.input_dim)
            .field("embedding_dim", &self.embedding_dim)
            .finish_non_exhaustive()
    }
}

/// Single affine transform of the raw features; ids play no part.
#[derive(Debug)]
pub struct LinearPrep {
    fc: Linear,
}

impl LinearPrep {
    #[must_use]
    pub fn new(input_dim: usize, output_dim: usize, seed: Option<u64>) -> Self {
        Self {
            fc: Linear::new(input_dim, output_dim, seed),
        }
    }
}

impl Preprocess for LinearPrep {
    fn forward(&self, _ids: &[usize], feats: &Tensor, _layer_idx: usize) -> Result<Tensor> {
        check_feat_width(self.fc.in_features(), feats)?;
        Ok(self.fc.forward(feats))
    }

    fn output_dim(&self) -> usize {
        self.fc.out_features()
    }
}

impl Module for LinearPrep {
    fn parameters(&self) -> Vec<&Tensor> {
        self.fc.parameters()
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.fc.parameters_mut()
    }
}

/// Two-layer transform of the raw features: affine, tanh, affine.
#[derive(Debug)]
pub struct NonLinearPrep {
    fc1: Linear,
    fc2: Linear,
}

impl NonLinearPrep {
    #[must_use]
    pub fn new(input_dim: usize, output_dim: usize, seed: Option<u64>) -> Self {
        Self {
            fc1: Linear::new(input_dim, output_dim, seed),
            fc2: Linear::new(output_dim, output_dim, seed.map(|s| s ^ 1)),
        }
    }
}

impl Preprocess for NonLinearPrep {
    fn forward(&self, _ids: &[usize], feats: &Tensor, _layer_idx: usize) -> Result<Tensor> {
        check_feat_width(self.fc1.in_features(), feats)?;
        Ok(self.fc2.forward(&self.fc1.forward(feats).tanh_act()))
    }

    fn output_dim(&self) -> usize {
        self.fc2.out_features()
    }
}

impl Module for NonLinearPrep {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.fc1.parameters();
        p.extend(self.fc2.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.fc1.parameters_mut();
        p.extend(self.fc2.parameters_mut());
        p
    }
}

/// Mean-pool the rows of `table` looked up by the integer-valued entries of
/// each feature row, yielding one pooled embedding row per node.
///
/// Entries are truncated to `usize`, so negative values collapse to token 0
/// and values at or above the table size panic in the lookup; callers own
/// the token-range contract.
fn mean_token_embedding(table: &Embedding, feats: &Tensor) -> Tensor {
    let (rows, cols) = (feats.n_rows(), feats.n_cols());
    let dim = table.embedding_dim();
    let mut data = Vec::with_capacity(rows * dim);

    for i in 0..rows {
        let tokens: Vec<usize> = feats.row(i).iter().map(|&v| v as usize).collect();
        let looked_up = table.forward(&tokens);

        let mut pooled = vec![0.0f32; dim];
        for t in 0..cols {
            for (p, &v) in pooled.iter_mut().zip(looked_up.row(t)) {
                *p += v;
            }
        }
        for p in &mut pooled {
            *p /= cols as f32;
        }
        data.extend_from_slice(&pooled);
    }

    Tensor::new(&data, &[rows, dim])
}

/// Treats the feature row as a bag of categorical tokens (word ids),
/// mean-pooling their embeddings, and concatenates the result with the
/// sentinel-ruled per-node embedding branch.
///
/// Feature entries must be integer-valued token ids in `[0, vocab_size)`;
/// an out-of-vocabulary id panics in the table lookup (caller error).
#[derive(Debug)]
pub struct BagOfWordsPrep {
    input_dim: usize,
    n_nodes: usize,
    output_dim_per_branch: usize,
    node_embedding: Embedding,
    node_fc: Linear,
    feat_embedding: Embedding,
    feat_fc: Linear,
}

impl BagOfWordsPrep {
    pub fn new(
        input_dim: usize,
        n_nodes: usize,
        output_dim: usize,
        embedding_dim: usize,
        vocab_size: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(VecindarioError::Configuration {
                message: "bag_of_words needs at least one token column (input_dim >= 1)"
                    .to_string(),
            });
        }
        Ok(Self {
            input_dim,
            n_nodes,
            output_dim_per_branch: output_dim,
            node_embedding: Embedding::new(n_nodes + 1, embedding_dim, seed),
            node_fc: Linear::new(embedding_dim, output_dim, seed),
            feat_embedding: Embedding::new(vocab_size, embedding_dim, seed.map(|s| s ^ 1)),
            feat_fc: Linear::new(embedding_dim, output_dim, seed.map(|s| s ^ 2)),
        })
    }
}

impl Preprocess for BagOfWordsPrep {
    fn forward(&self, ids: &[usize], feats: &Tensor, layer_idx: usize) -> Result<Tensor> {
        check_feat_width(self.input_dim, feats)?;

        let lookup: Vec<usize> = if layer_idx > 0 {
            ids.to_vec()
        } else {
            vec![self.n_nodes; ids.len()]
        };
        let node_embs = self.node_fc.forward(&self.node_embedding.forward(&lookup));

        let feat_embs = self
            .feat_fc
            .forward(&mean_token_embedding(&self.feat_embedding, feats));

        Ok(Tensor::concat_cols(&feat_embs, &node_embs))
    }

    fn output_dim(&self) -> usize {
        self.output_dim_per_branch * 2
    }
}

impl Module for BagOfWordsPrep {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.node_embedding.parameters();
        p.extend(self.node_fc.parameters());
        p.extend(self.feat_embedding.parameters());
        p.extend(self.feat_fc.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.node_embedding.parameters_mut();
        p.extend(self.node_fc.parameters_mut());
        p.extend(self.feat_embedding.parameters_mut());
        p.extend(self.feat_fc.parameters_mut());
        p
    }
}

/// Splits the feature row into leading continuous columns and `n_cat`
/// trailing categorical columns; the continuous block goes through a tanh
/// MLP, the categorical block through a shared mean-pooled token embedding,
/// and the concatenation is projected down to `output_dim`.
///
/// The trailing categorical columns must hold integer-valued token ids in
/// `[0, vocab_size)`; an out-of-vocabulary id panics in the table lookup
/// (caller error).
#[derive(Debug)]
pub struct GeoBagOfWordsPrep {
    input_dim: usize,
    n_cat: usize,
    con_fc1: Linear,
    con_fc2: Linear,
    cat_embedding: Embedding,
    cat_fc: Linear,
    fc: Linear,
}

impl GeoBagOfWordsPrep {
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        embedding_dim: usize,
        vocab_size: usize,
        n_cat: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        if n_cat == 0 || n_cat >= input_dim {
            return Err(VecindarioError::Configuration {
                message: format!(
                    "geo_bag_of_words needs 0 < n_cat < input_dim (got n_cat = {n_cat}, input_dim = {input_dim})"
                ),
            });
        }
        Ok(Self {
            input_dim,
            n_cat,
            con_fc1: Linear::new(input_dim - n_cat, output_dim, seed),
            con_fc2: Linear::new(output_dim, output_dim, seed.map(|s| s ^ 1)),
            cat_embedding: Embedding::new(vocab_size, embedding_dim, seed.map(|s| s ^ 2)),
            cat_fc: Linear::new(embedding_dim, output_dim, seed.map(|s| s ^ 3)),
            fc: Linear::new(output_dim * 2, output_dim, seed.map(|s| s ^ 4)),
        })
    }
}

impl Preprocess for GeoBagOfWordsPrep {
    fn forward(&self, _ids: &[usize], feats: &Tensor, _layer_idx: usize) -> Result<Tensor> {
        check_feat_width(self.input_dim, feats)?;

        let n_con = self.input_dim - self.n_cat;
        let con_feats = feats.slice_cols(0, n_con);
        let con_embs = self.con_fc2.forward(&self.con_fc1.forward(&con_feats).tanh_act());

        let cat_feats = feats.slice_cols(n_con, self.n_cat);
        let cat_embs = self
            .cat_fc
            .forward(&mean_token_embedding(&self.cat_embedding, &cat_feats));

        Ok(self.fc.forward(&Tensor::concat_cols(&cat_embs, &con_embs)))
    }

    fn output_dim(&self) -> usize {
        self.fc.out_features()
    }
}

impl Module for GeoBagOfWordsPrep {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.con_fc1.parameters();
        p.extend(self.con_fc2.parameters());
        p.extend(self.cat_embedding.parameters());
        p.extend(self.cat_fc.parameters());
        p.extend(self.fc.parameters());
        p
    }
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.con_fc1.parameters_mut();
        p.extend(self.con_fc2.parameters_mut());
        p.extend(self.cat_embedding.parameters_mut());
        p.extend(self.cat_fc.parameters_mut());
        p.extend(self.fc.parameters_mut());
        p
    }
}

/// The closed set of preprocessor strategies, selected by configuration name.
#[derive(Debug)]
pub enum Prep {
    Identity(IdentityPrep),
    NodeEmbedding(NodeEmbeddingPrep),
    Linear(LinearPrep),
    NonLinear(NonLinearPrep),
    BagOfWords(BagOfWordsPrep),
    GeoBagOfWords(GeoBagOfWordsPrep),
}

impl Prep {
    /// Construct a preprocessor by name from a shared config.
    pub fn from_name(name: &str, config: &PrepConfig) -> Result<Self> {
        match name {
            "identity" => Ok(Prep::Identity(IdentityPrep::new(config.input_dim))),
            "node_embedding" => Ok(Prep::NodeEmbedding(NodeEmbeddingPrep::new(
                config.input_dim,
                config.n_nodes,
                config.embedding_dim,
                config.seed,
            ))),
            "linear" => Ok(Prep::Linear(LinearPrep::new(
                config.input_dim,
                config.output_dim,
                config.seed,
            ))),
            "nonlinear" => Ok(Prep::NonLinear(NonLinearPrep::new(
                config.input_dim,
                config.output_dim,
                config.seed,
            ))),
            "bag_of_words" => Ok(Prep::BagOfWords(BagOfWordsPrep::new(
                config.input_dim,
                config.n_nodes,
                config.output_dim,
                config.embedding_dim,
                config.vocab_size,
                config.seed,
            )?)),
            "geo_bag_of_words" => Ok(Prep::GeoBagOfWords(GeoBagOfWordsPrep::new(
                config.input_dim,
                config.output_dim,
                config.embedding_dim,
                config.vocab_size,
                config.n_cat,
                config.seed,
            )?)),
            other => Err(VecindarioError::InvalidArgument {
                param: "name".to_string(),
                value: other.to_string(),
                constraint:
                    "one of: identity, node_embedding, linear, nonlinear, bag_of_words, geo_bag_of_words"
                        .to_string(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Prep::Identity(_) => "identity",
            Prep::NodeEmbedding(_) => "node_embedding",
            Prep::Linear(_) => "linear",
            Prep::NonLinear(_) => "nonlinear",
            Prep::BagOfWords(_) => "bag_of_words",
            Prep::GeoBagOfWords(_) => "geo_bag_of_words",
        }
    }
}

impl Preprocess for Prep {
    fn forward(&self, ids: &[usize], feats: &Tensor, layer_idx: usize) -> Result<Tensor> {
        match self {
            Prep::Identity(p) => p.forward(ids, feats, layer_idx),
            Prep::NodeEmbedding(p) => p.forward(ids, feats, layer_idx),
            Prep::Linear(p) => p.forward(ids, feats, layer_idx),
            Prep::NonLinear(p) => p.forward(ids, feats, layer_idx),
            Prep::BagOfWords(p) => p.forward(ids, feats, layer_idx),
            Prep::GeoBagOfWords(p) => p.forward(ids, feats, layer_idx),
        }
    }

    fn output_dim(&self) -> usize {
        match self {
            Prep::Identity(p) => p.output_dim(),
            Prep::NodeEmbedding(p) => p.output_dim(),
            Prep::Linear(p) => p.output_dim(),
            Prep::NonLinear(p) => p.output_dim(),
            Prep::BagOfWords(p) => p.output_dim(),
            Prep::GeoBagOfWords(p) => p.output_dim(),
        }
    }
}

impl Module for Prep {
    fn parameters(&self) -> Vec<&Tensor> {
        match self {
            Prep::Identity(p) => p.parameters(),
            Prep::NodeEmbedding(p) => p.parameters(),
            Prep::Linear(p) => p.parameters(),
            Prep::NonLinear(p) => p.parameters(),
            Prep::BagOfWords(p) => p.parameters(),
            Prep::GeoBagOfWords(p) => p.parameters(),
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match self {
            Prep::Identity(p) => p.parameters_mut(),
            Prep::NodeEmbedding(p) => p.parameters_mut(),
            Prep::Linear(p) => p.parameters_mut(),
            Prep::NonLinear(p) => p.parameters_mut(),
            Prep::BagOfWords(p) => p.parameters_mut(),
            Prep::GeoBagOfWords(p) => p.parameters_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feats(rows: usize, cols: usize) -> Tensor {
        let data: Vec<f32> = (0..rows * cols).map(|i| (i as f32 * 0.1).sin()).collect();
        Tensor::new(&data, &[rows, cols])
    }

    #[test]
    fn test_identity_bit_for_bit() {
        let prep = IdentityPrep::new(16);
        let x = feats(3, 16);
        let out = prep.forward(&[0, 1, 2], &x, 0).unwrap();
        assert_eq!(out.data(), x.data());
        assert_eq!(prep.output_dim(), 16);
    }

    #[test]
    fn test_identity_rejects_wrong_width() {
        let prep = IdentityPrep::new(16);
        let err = prep.forward(&[0], &feats(1, 8), 0).unwrap_err();
        assert!(matches!(err, VecindarioError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_node_embedding_output_dim() {
        let with_feats = NodeEmbeddingPrep::new(10, 50, 8, Some(42));
        assert_eq!(with_feats.output_dim(), 18);

        let featless = NodeEmbeddingPrep::new(0, 50, 8, Some(42));
        assert_eq!(featless.output_dim(), 8);
    }

    #[test]
    fn test_node_embedding_sentinel_at_layer_zero() {
        // Layer 0 must ignore the ids entirely.
        let prep = NodeEmbeddingPrep::new(0, 50, 8, Some(42));
        let x = Tensor::zeros(&[2, 0]);

        let a = prep.forward(&[3, 17], &x, 0).unwrap();
        let b = prep.forward(&[40, 5], &x, 0).unwrap();
        assert_eq!(a.data(), b.data());

        // And both rows equal the sentinel row.
        assert_eq!(a.row(0), a.row(1));
    }

    #[test]
    fn test_node_embedding_uses_ids_at_deeper_layers() {
        let prep = NodeEmbeddingPrep::new(0, 50, 8, Some(42));
        let x = Tensor::zeros(&[2, 0]);

        let a = prep.forward(&[3, 17], &x, 1).unwrap();
        let b = prep.forward(&[40, 5], &x, 1).unwrap();
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn test_node_embedding_concatenates_feats() {
        let prep = NodeEmbeddingPrep::new(4, 10, 8, Some(42));
        let x = feats(3, 4);
        let out = prep.forward(&[0, 1, 2], &x, 1).unwrap();
        assert_eq!(out.shape(), &[3, 12]);
        // Raw features occupy the leading columns unchanged.
        assert_eq!(&out.row(0)[..4], x.row(0));
    }

    #[test]
    fn test_linear_prep_shape() {
        let prep = LinearPrep::new(16, 32, Some(42));
        let out = prep.forward(&[0, 1], &feats(2, 16), 0).unwrap();
        assert_eq!(out.shape(), &[2, 32]);
        assert_eq!(out.n_cols(), prep.output_dim());
    }

    #[test]
    fn test_nonlinear_prep_shape() {
        let prep = NonLinearPrep::new(16, 32, Some(42));
        let out = prep.forward(&[0], &feats(1, 16), 0).unwrap();
        assert_eq!(out.shape(), &[1, 32]);
    }

    #[test]
    fn test_bag_of_words_output_dim_doubles() {
        let prep = BagOfWordsPrep::new(6, 20, 32, 16, 100, Some(42)).unwrap();
        assert_eq!(prep.output_dim(), 64);

        let tokens = Tensor::new(&[1.0, 4.0, 9.0, 2.0, 2.0, 7.0], &[1, 6]);
        let out = prep.forward(&[0], &tokens, 1).unwrap();
        assert_eq!(out.shape(), &[1, 64]);
    }

    #[test]
    fn test_bag_of_words_sentinel_rule() {
        let prep = BagOfWordsPrep::new(3, 20, 8, 4, 50, Some(42)).unwrap();
        let tokens = Tensor::new(&[1.0, 2.0, 3.0], &[1, 3]);

        let a = prep.forward(&[5], &tokens, 0).unwrap();
        let b = prep.forward(&[11], &tokens, 0).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_bag_of_words_out_of_vocab_token_panics() {
        let prep = BagOfWordsPrep::new(2, 20, 8, 4, 50, Some(42)).unwrap();
        let tokens = Tensor::new(&[1.0, 99.0], &[1, 2]);
        let _ = prep.forward(&[0], &tokens, 1);
    }

    #[test]
    fn test_bag_of_words_requires_tokens() {
        let err = BagOfWordsPrep::new(0, 20, 8, 4, 50, None).unwrap_err();
        assert!(matches!(err, VecindarioError::Configuration { .. }));
    }

    #[test]
    fn test_geo_split_and_project() {
        // 10 columns: 7 continuous + 3 categorical.
        let prep = GeoBagOfWordsPrep::new(10, 16, 8, 100, 3, Some(42)).unwrap();
        assert_eq!(prep.output_dim(), 16);

        let mut data = vec![0.5f32; 2 * 10];
        // trailing columns are token ids
        data[7] = 3.0;
        data[8] = 9.0;
        data[9] = 1.0;
        data[17] = 2.0;
        data[18] = 2.0;
        data[19] = 8.0;
        let x = Tensor::new(&data, &[2, 10]);

        let out = prep.forward(&[0, 1], &x, 0).unwrap();
        assert_eq!(out.shape(), &[2, 16]);
    }

    #[test]
    fn test_geo_rejects_bad_split() {
        let err = GeoBagOfWordsPrep::new(4, 8, 8, 100, 4, None).unwrap_err();
        assert!(matches!(err, VecindarioError::Configuration { .. }));
    }

    #[test]
    fn test_mean_token_embedding_pools() {
        let mut table = Embedding::new(3, 2, Some(42));
        table.set_weight(Tensor::new(&[0.0, 0.0, 2.0, 4.0, 4.0, 8.0], &[3, 2]));

        // tokens 1 and 2 -> mean of [2,4] and [4,8] = [3,6]
        let x = Tensor::new(&[1.0, 2.0], &[1, 2]);
        let pooled = mean_token_embedding(&table, &x);
        assert_eq!(pooled.data(), &[3.0, 6.0]);
    }

    #[test]
    fn test_from_name_all_variants() {
        let config = PrepConfig::new(30, 40).with_seed(42).with_n_cat(4).with_vocab_size(200);
        for name in [
            "identity",
            "node_embedding",
            "linear",
            "nonlinear",
            "bag_of_words",
            "geo_bag_of_words",
        ] {
            let prep = Prep::from_name(name, &config).unwrap();
            assert_eq!(prep.name(), name);
            assert!(prep.output_dim() > 0);
        }

        let err = Prep::from_name("mystery", &config).unwrap_err();
        assert!(matches!(err, VecindarioError::InvalidArgument { .. }));
    }

    #[test]
    fn test_every_prep_width_matches_declaration() {
        let config = PrepConfig::new(30, 40).with_seed(7).with_n_cat(4).with_vocab_size(200);
        let x = feats(5, 30).map(f32::abs); // tokens must be non-negative
        let ids = [0, 1, 2, 3, 4];

        for name in [
            "identity",
            "node_embedding",
            "linear",
            "nonlinear",
            "bag_of_words",
            "geo_bag_of_words",
        ] {
            let prep = Prep::from_name(name, &config).unwrap();
            let out = prep.forward(&ids, &x, 1).unwrap();
            assert_eq!(out.shape(), &[5, prep.output_dim()], "width for {name}");
        }
    }
}
