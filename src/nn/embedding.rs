//! Id-indexed lookup table of trainable row vectors.

use crate::init::normal;
use crate::module::Module;
use crate::tensor::Tensor;

/// Lookup table mapping integer ids to trainable embedding rows.
///
/// Rows are initialized from a unit normal. Tables that carry a sentinel
/// slot are simply constructed one row larger by the owning component; the
/// table itself treats every index in `[0, num_embeddings)` alike.
pub struct Embedding {
    /// Table, shape `[num_embeddings, embedding_dim]`
    weight: Tensor,
    num_embeddings: usize,
    embedding_dim: usize,
}

impl Embedding {
    #[must_use]
    pub fn new(num_embeddings: usize, embedding_dim: usize, seed: Option<u64>) -> Self {
        Self {
            weight: normal(&[num_embeddings, embedding_dim], 0.0, 1.0, seed),
            num_embeddings,
            embedding_dim,
        }
    }

    #[must_use]
    pub fn num_embeddings(&self) -> usize {
        self.num_embeddings
    }

    #[must_use]
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Gather the rows for a batch of ids into a `(len, embedding_dim)` tensor.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range id (caller error).
    #[must_use]
    pub fn forward(&self, ids: &[usize]) -> Tensor {
        let mut data = Vec::with_capacity(ids.len() * self.embedding_dim);
        for &id in ids {
            assert!(
                id < self.num_embeddings,
                "embedding id {id} out of range (table holds {})",
                self.num_embeddings
            );
            data.extend_from_slice(self.weight.row(id));
        }
        Tensor::new(&data, &[ids.len(), self.embedding_dim])
    }

    /// Replace the table (test hook and pre-trained loading).
    pub fn set_weight(&mut self, weight: Tensor) {
        assert_eq!(
            weight.shape(),
            &[self.num_embeddings, self.embedding_dim],
            "embedding table shape is fixed at construction"
        );
        self.weight = weight;
    }
}

impl Module for Embedding {
    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight]
    }
}

impl std::fmt::Debug for Embedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedding")
            .field("num_embeddings", &self.num_embeddings)
            .field("embedding_dim", &self.embedding_dim)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_shape() {
        let emb = Embedding::new(10, 4, Some(42));
        let out = emb.forward(&[0, 3, 9]);
        assert_eq!(out.shape(), &[3, 4]);
    }

    #[test]
    fn test_lookup_gathers_rows() {
        let mut emb = Embedding::new(3, 2, Some(42));
        emb.set_weight(Tensor::new(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0], &[3, 2]));
        let out = emb.forward(&[2, 0]);
        assert_eq!(out.data(), &[2.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_repeated_ids_share_rows() {
        let emb = Embedding::new(5, 3, Some(42));
        let out = emb.forward(&[1, 1]);
        assert_eq!(out.row(0), out.row(1));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_panics() {
        let emb = Embedding::new(4, 2, Some(42));
        let _ = emb.forward(&[4]);
    }
}
