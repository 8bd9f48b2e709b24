//! Graph adjacency storage.
//!
//! Two layouts back the neighbor samplers:
//!
//! - [`DenseAdjacency`]: every node carries exactly the same number of
//!   neighbor-id columns. Up/down-sampling each node to that uniform width
//!   (and choosing a padding id) happens when the graph is built, before it
//!   reaches this crate.
//! - [`CsrAdjacency`]: compressed-row storage holding each node's true,
//!   variable-count neighbor list, with per-node degrees available in O(1).
//!
//! Both are immutable after construction; the graph does not change during
//! a forward pass.

use crate::error::{Result, VecindarioError};

/// Rectangular `(n_nodes, width)` table of neighbor ids.
#[derive(Debug, Clone)]
pub struct DenseAdjacency {
    neighbors: Vec<usize>,
    n_nodes: usize,
    width: usize,
}

impl DenseAdjacency {
    /// Build from per-node rows, which must all have the same length.
    pub fn from_rows(rows: &[Vec<usize>]) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(VecindarioError::ShapeMismatch {
                    expected: format!("{width} neighbor columns in every row"),
                    actual: format!("{} columns in row {i}", row.len()),
                });
            }
        }

        let mut neighbors = Vec::with_capacity(rows.len() * width);
        for row in rows {
            neighbors.extend_from_slice(row);
        }

        Ok(Self {
            neighbors,
            n_nodes: rows.len(),
            width,
        })
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Uniform neighbor-row width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// The full fixed-width neighbor row of `node`.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range node id (caller error).
    #[must_use]
    pub fn row(&self, node: usize) -> &[usize] {
        assert!(node < self.n_nodes, "node id {node} out of range");
        &self.neighbors[node * self.width..(node + 1) * self.width]
    }
}

/// Compressed-row adjacency: `indptr[i]..indptr[i + 1]` spans node i's
/// stored neighbor entries in `indices`.
#[derive(Debug, Clone)]
pub struct CsrAdjacency {
    indptr: Vec<usize>,
    indices: Vec<usize>,
    n_nodes: usize,
}

impl CsrAdjacency {
    /// Build from per-node neighbor lists (rows may be empty).
    #[must_use]
    pub fn from_rows(rows: &[Vec<usize>]) -> Self {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        indptr.push(0);
        for row in rows {
            indices.extend_from_slice(row);
            indptr.push(indices.len());
        }
        Self {
            indptr,
            indices,
            n_nodes: rows.len(),
        }
    }

    /// Build from `(source, target)` edge pairs. Nodes never named as a
    /// source end up with degree 0.
    #[must_use]
    pub fn from_edges(n_nodes: usize, edges: &[(usize, usize)]) -> Self {
        let mut rows: Vec<Vec<usize>> = vec![Vec::new(); n_nodes];
        for &(src, tgt) in edges {
            if src < n_nodes && tgt < n_nodes {
                rows[src].push(tgt);
            }
        }
        Self::from_rows(&rows)
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Number of stored neighbor entries for `node`; 0 for isolated nodes.
    #[must_use]
    pub fn degree(&self, node: usize) -> usize {
        assert!(node < self.n_nodes, "node id {node} out of range");
        self.indptr[node + 1] - self.indptr[node]
    }

    /// The true stored neighbor entries of `node` (no padding).
    #[must_use]
    pub fn neighbors(&self, node: usize) -> &[usize] {
        assert!(node < self.n_nodes, "node id {node} out of range");
        &self.indices[self.indptr[node]..self.indptr[node + 1]]
    }

    /// Total stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// Either adjacency layout, for name-keyed sampler construction.
#[derive(Debug, Clone)]
pub enum Adjacency {
    Dense(DenseAdjacency),
    Csr(CsrAdjacency),
}

impl From<DenseAdjacency> for Adjacency {
    fn from(adj: DenseAdjacency) -> Self {
        Adjacency::Dense(adj)
    }
}

impl From<CsrAdjacency> for Adjacency {
    fn from(adj: CsrAdjacency) -> Self {
        Adjacency::Csr(adj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_from_rows() {
        let adj = DenseAdjacency::from_rows(&[vec![1, 2, 3], vec![0, 0, 2]]).unwrap();
        assert_eq!(adj.n_nodes(), 2);
        assert_eq!(adj.width(), 3);
        assert_eq!(adj.row(1), &[0, 0, 2]);
    }

    #[test]
    fn test_dense_ragged_rows_rejected() {
        let err = DenseAdjacency::from_rows(&[vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(err, VecindarioError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_csr_from_rows() {
        let adj = CsrAdjacency::from_rows(&[vec![], vec![5, 7, 9], vec![1]]);
        assert_eq!(adj.n_nodes(), 3);
        assert_eq!(adj.degree(0), 0);
        assert_eq!(adj.degree(1), 3);
        assert_eq!(adj.neighbors(1), &[5, 7, 9]);
        assert_eq!(adj.nnz(), 4);
    }

    #[test]
    fn test_csr_from_edges() {
        let adj = CsrAdjacency::from_edges(3, &[(0, 1), (0, 2), (2, 0)]);
        assert_eq!(adj.neighbors(0), &[1, 2]);
        assert_eq!(adj.degree(1), 0);
        assert_eq!(adj.neighbors(2), &[0]);
    }

    #[test]
    fn test_csr_out_of_range_edges_dropped() {
        let adj = CsrAdjacency::from_edges(2, &[(0, 1), (5, 0), (1, 9)]);
        assert_eq!(adj.nnz(), 1);
    }
}
