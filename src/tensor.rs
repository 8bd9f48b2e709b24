//! Dense row-major f32 tensor.
//!
//! The batched representations flowing between samplers, preprocessors, and
//! aggregators are all small 2-D or 3-D blocks of f32, so the tensor type
//! stays deliberately minimal: contiguous storage, a shape vector, and the
//! handful of operations the forward passes need. There is no gradient
//! tracking here; parameter updates happen outside a forward pass.

use std::fmt;

/// A dense tensor with row-major contiguous storage.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl Tensor {
    /// Create a tensor from a slice with the given shape.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match the product of shape dimensions.
    #[must_use]
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected
        );
        Self {
            data: data.to_vec(),
            shape: shape.to_vec(),
        }
    }

    /// Create a 1-D tensor from a slice.
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self::new(data, &[data.len()])
    }

    /// Create a tensor filled with zeros.
    #[must_use]
    pub fn zeros(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product();
        Self::new(&vec![0.0; len], shape)
    }

    /// Create a tensor filled with ones.
    #[must_use]
    pub fn ones(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product();
        Self::new(&vec![1.0; len], shape)
    }

    /// Shape of the tensor.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Underlying data, row-major.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable view of the underlying data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Total number of elements.
    #[must_use]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Number of rows of a 2-D tensor.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2-D.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        assert_eq!(self.shape.len(), 2, "n_rows requires a 2-D tensor");
        self.shape[0]
    }

    /// Number of columns of a 2-D tensor.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2-D.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        assert_eq!(self.shape.len(), 2, "n_cols requires a 2-D tensor");
        self.shape[1]
    }

    /// Borrow row `i` of a 2-D tensor.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        let cols = self.n_cols();
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Reinterpret the storage under a new shape with the same element count.
    ///
    /// # Panics
    ///
    /// Panics if the element counts differ.
    #[must_use]
    pub fn view(&self, shape: &[usize]) -> Self {
        Self::new(&self.data, shape)
    }

    /// Matrix product of two 2-D tensors: `[m, k] x [k, n] -> [m, n]`.
    ///
    /// # Panics
    ///
    /// Panics on non-2-D inputs or an inner-dimension mismatch.
    #[must_use]
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        let (m, k) = (self.n_rows(), self.n_cols());
        let (k2, n) = (other.n_rows(), other.n_cols());
        assert_eq!(k, k2, "matmul inner dimensions: {k} vs {k2}");

        let mut out = vec![0.0f32; m * n];
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                if a == 0.0 {
                    continue;
                }
                let brow = &other.data[p * n..(p + 1) * n];
                let orow = &mut out[i * n..(i + 1) * n];
                for (o, &b) in orow.iter_mut().zip(brow) {
                    *o += a * b;
                }
            }
        }
        Tensor::new(&out, &[m, n])
    }

    /// Element-wise sum of two same-shape tensors.
    ///
    /// # Panics
    ///
    /// Panics on a shape mismatch.
    #[must_use]
    pub fn add(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.shape, other.shape, "add requires matching shapes");
        let data: Vec<f32> = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a + b)
            .collect();
        Tensor::new(&data, &self.shape)
    }

    /// Element-wise product of two same-shape tensors.
    #[must_use]
    pub fn mul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.shape, other.shape, "mul requires matching shapes");
        let data: Vec<f32> = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a * b)
            .collect();
        Tensor::new(&data, &self.shape)
    }

    /// Add a 1-D row vector to every row of a 2-D tensor.
    ///
    /// # Panics
    ///
    /// Panics if `row` length doesn't match the column count.
    #[must_use]
    pub fn broadcast_add_row(&self, row: &Tensor) -> Tensor {
        let cols = self.n_cols();
        assert_eq!(row.numel(), cols, "bias length must equal column count");
        let mut data = self.data.clone();
        for chunk in data.chunks_mut(cols) {
            for (v, &b) in chunk.iter_mut().zip(row.data()) {
                *v += b;
            }
        }
        Tensor::new(&data, &self.shape)
    }

    /// Concatenate two 2-D tensors along the feature (column) axis.
    ///
    /// # Panics
    ///
    /// Panics if the row counts differ.
    #[must_use]
    pub fn concat_cols(a: &Tensor, b: &Tensor) -> Tensor {
        let rows = a.n_rows();
        assert_eq!(rows, b.n_rows(), "concat_cols requires equal row counts");
        let (ca, cb) = (a.n_cols(), b.n_cols());

        let mut data = Vec::with_capacity(rows * (ca + cb));
        for i in 0..rows {
            data.extend_from_slice(a.row(i));
            data.extend_from_slice(b.row(i));
        }
        Tensor::new(&data, &[rows, ca + cb])
    }

    /// Take columns `[start, start + width)` of a 2-D tensor.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the column count.
    #[must_use]
    pub fn slice_cols(&self, start: usize, width: usize) -> Tensor {
        let (rows, cols) = (self.n_rows(), self.n_cols());
        assert!(start + width <= cols, "column slice out of range");
        let mut data = Vec::with_capacity(rows * width);
        for i in 0..rows {
            let base = i * cols + start;
            data.extend_from_slice(&self.data[base..base + width]);
        }
        Tensor::new(&data, &[rows, width])
    }

    /// Apply a function element-wise.
    #[must_use]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        let data: Vec<f32> = self.data.iter().map(|&v| f(v)).collect();
        Tensor::new(&data, &self.shape)
    }

    /// Rectified linear unit: max(0, x).
    #[must_use]
    pub fn relu(&self) -> Tensor {
        self.map(|v| v.max(0.0))
    }

    /// Hyperbolic tangent.
    #[must_use]
    pub fn tanh_act(&self) -> Tensor {
        self.map(f32::tanh)
    }

    /// Logistic sigmoid: 1 / (1 + exp(-x)).
    #[must_use]
    pub fn sigmoid(&self) -> Tensor {
        self.map(|v| 1.0 / (1.0 + (-v).exp()))
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("numel", &self.data.len())
            .finish_non_exhaustive()
    }
}
