//! Neighbor samplers.
//!
//! A sampler turns a batch of node ids into a fixed-size draw of neighbor
//! ids, bounding the cost of neighborhood aggregation on graphs too large
//! to aggregate exactly. Randomness comes from a caller-supplied RNG handle
//! rather than ambient global state, so tests (and reproducible training
//! runs) inject a seeded `StdRng`.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::adjacency::{Adjacency, CsrAdjacency, DenseAdjacency};
use crate::error::{Result, VecindarioError};

/// Common sampling contract.
///
/// For each id in `ids`, draws neighbor ids from that node's stored
/// adjacency row. Output is flattened: the samples for `ids[i]` occupy the
/// i-th consecutive block of the returned vector.
pub trait NeighborSample {
    fn sample(&self, rng: &mut dyn RngCore, ids: &[usize], n_samples: usize)
        -> Result<Vec<usize>>;
}

/// Samples from a fixed-width neighbor table by permuting columns.
///
/// One random column permutation is shared by every row in the batch for a
/// given call, then the first `n_samples` permuted columns are kept. This
/// does not sample each row independently; it trades rigor for a single
/// cheap gather. Requests wider than the table are truncated to the table
/// width, since upsampling to a fixed degree already happened when the
/// dense table was built.
#[derive(Debug, Clone)]
pub struct DenseNeighborSampler {
    adjacency: DenseAdjacency,
}

impl DenseNeighborSampler {
    #[must_use]
    pub fn new(adjacency: DenseAdjacency) -> Self {
        Self { adjacency }
    }

    #[must_use]
    pub fn adjacency(&self) -> &DenseAdjacency {
        &self.adjacency
    }
}

impl NeighborSample for DenseNeighborSampler {
    fn sample(
        &self,
        rng: &mut dyn RngCore,
        ids: &[usize],
        n_samples: usize,
    ) -> Result<Vec<usize>> {
        let width = self.adjacency.width();
        let k = n_samples.min(width);

        let mut perm: Vec<usize> = (0..width).collect();
        perm.shuffle(rng);

        let mut out = Vec::with_capacity(ids.len() * k);
        for &id in ids {
            let row = self.adjacency.row(id);
            out.extend(perm[..k].iter().map(|&col| row[col]));
        }
        Ok(out)
    }
}

/// Samples with replacement from true variable-degree neighbor lists.
///
/// The per-node degree table is computed once at construction. Each
/// (node, sample) pair draws independently: an index from a range wider
/// than any degree, reduced modulo the node's degree, so only genuinely
/// stored entries are ever selected. Querying a degree-0 node is a caller
/// contract violation and is rejected before it can become a
/// modulo-by-zero fault.
#[derive(Debug, Clone)]
pub struct SparseNeighborSampler {
    adjacency: CsrAdjacency,
    degrees: Vec<usize>,
    /// Width of the raw draw range before modulo reduction.
    sample_space: usize,
}

impl SparseNeighborSampler {
    #[must_use]
    pub fn new(adjacency: CsrAdjacency) -> Self {
        let degrees: Vec<usize> = (0..adjacency.n_nodes())
            .map(|i| adjacency.degree(i))
            .collect();
        // At least as wide as the largest degree, so every stored entry is
        // reachable even when rows carry duplicates and exceed n_nodes.
        let max_degree = degrees.iter().copied().max().unwrap_or(0);
        let sample_space = adjacency.n_nodes().max(max_degree).max(1);
        Self {
            adjacency,
            degrees,
            sample_space,
        }
    }

    #[must_use]
    pub fn adjacency(&self) -> &CsrAdjacency {
        &self.adjacency
    }

    /// Degree of `node` as recorded at construction.
    #[must_use]
    pub fn degree(&self, node: usize) -> usize {
        self.degrees[node]
    }
}

impl NeighborSample for SparseNeighborSampler {
    fn sample(
        &self,
        rng: &mut dyn RngCore,
        ids: &[usize],
        n_samples: usize,
    ) -> Result<Vec<usize>> {
        if n_samples == 0 {
            return Err(VecindarioError::InvalidArgument {
                param: "n_samples".to_string(),
                value: "0".to_string(),
                constraint: "must be a positive integer".to_string(),
            });
        }

        let mut out = Vec::with_capacity(ids.len() * n_samples);
        for &id in ids {
            let degree = self.degrees[id];
            if degree == 0 {
                return Err(VecindarioError::InvalidArgument {
                    param: "ids".to_string(),
                    value: id.to_string(),
                    constraint: "node must have degree >= 1 to be sampled".to_string(),
                });
            }

            let row = self.adjacency.neighbors(id);
            for _ in 0..n_samples {
                let sel = rng.gen_range(0..self.sample_space) % degree;
                out.push(row[sel]);
            }
        }
        Ok(out)
    }
}

/// The closed set of sampler strategies, selected by configuration name.
#[derive(Debug, Clone)]
pub enum Sampler {
    Uniform(DenseNeighborSampler),
    SparseUniform(SparseNeighborSampler),
}

impl Sampler {
    /// Construct a sampler by name. `"uniform"` requires a dense adjacency
    /// table, `"sparse_uniform"` a compressed-row one.
    pub fn from_name(name: &str, adjacency: Adjacency) -> Result<Self> {
        match (name, adjacency) {
            ("uniform", Adjacency::Dense(adj)) => {
                Ok(Sampler::Uniform(DenseNeighborSampler::new(adj)))
            }
            ("sparse_uniform", Adjacency::Csr(adj)) => {
                Ok(Sampler::SparseUniform(SparseNeighborSampler::new(adj)))
            }
            ("uniform" | "sparse_uniform", _) => Err(VecindarioError::Configuration {
                message: format!("sampler '{name}' given the wrong adjacency layout"),
            }),
            (other, _) => Err(VecindarioError::InvalidArgument {
                param: "name".to_string(),
                value: other.to_string(),
                constraint: "one of: uniform, sparse_uniform".to_string(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Sampler::Uniform(_) => "uniform",
            Sampler::SparseUniform(_) => "sparse_uniform",
        }
    }
}

impl NeighborSample for Sampler {
    fn sample(
        &self,
        rng: &mut dyn RngCore,
        ids: &[usize],
        n_samples: usize,
    ) -> Result<Vec<usize>> {
        match self {
            Sampler::Uniform(s) => s.sample(rng, ids, n_samples),
            Sampler::SparseUniform(s) => s.sample(rng, ids, n_samples),
        }
    }
}
