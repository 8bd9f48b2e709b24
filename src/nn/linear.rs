//! Fully connected (linear) layer: y = xW^T + b.

use crate::init::{xavier_uniform, zeros};
use crate::module::Module;
use crate::tensor::Tensor;

/// Affine transform of a batch of row vectors.
///
/// Weight initialization follows Xavier/Glorot. The transposed weight is
/// cached at construction so the forward pass is a single matmul.
///
/// # Shape
///
/// - Input: `(batch, in_features)`
/// - Output: `(batch, out_features)`
pub struct Linear {
    /// Weight matrix, shape `[out_features, in_features]`
    weight: Tensor,
    /// Cached transpose `[in_features, out_features]`
    weight_t: Tensor,
    /// Bias vector `[out_features]`, or None
    bias: Option<Tensor>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a layer with bias.
    #[must_use]
    pub fn new(in_features: usize, out_features: usize, seed: Option<u64>) -> Self {
        Self::build(in_features, out_features, true, seed)
    }

    /// Create a layer without a bias term.
    #[must_use]
    pub fn without_bias(in_features: usize, out_features: usize, seed: Option<u64>) -> Self {
        Self::build(in_features, out_features, false, seed)
    }

    fn build(in_features: usize, out_features: usize, with_bias: bool, seed: Option<u64>) -> Self {
        let weight = xavier_uniform(&[out_features, in_features], in_features, out_features, seed);
        let weight_t = transpose_2d(&weight);
        let bias = with_bias.then(|| zeros(&[out_features]));

        Self {
            weight,
            weight_t,
            bias,
            in_features,
            out_features,
        }
    }

    #[must_use]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    #[must_use]
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    #[must_use]
    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }

    /// Replace the weight (test hook and pre-trained loading); refreshes the
    /// cached transpose.
    pub fn set_weight(&mut self, weight: Tensor) {
        self.weight_t = transpose_2d(&weight);
        self.weight = weight;
    }

    /// Replace the bias.
    pub fn set_bias(&mut self, bias: Tensor) {
        self.bias = Some(bias);
    }

    /// Apply the transform to a `(batch, in_features)` tensor.
    #[must_use]
    pub fn forward(&self, input: &Tensor) -> Tensor {
        let out = input.matmul(&self.weight_t);
        match &self.bias {
            Some(b) => out.broadcast_add_row(b),
            None => out,
        }
    }
}

impl Module for Linear {
    fn parameters(&self) -> Vec<&Tensor> {
        match &self.bias {
            Some(b) => vec![&self.weight, b],
            None => vec![&self.weight],
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match &mut self.bias {
            Some(b) => vec![&mut self.weight, b],
            None => vec![&mut self.weight],
        }
    }
}

impl std::fmt::Debug for Linear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linear")
            .field("in_features", &self.in_features)
            .field("out_features", &self.out_features)
            .field("bias", &self.bias.is_some())
            .finish_non_exhaustive()
    }
}

fn transpose_2d(t: &Tensor) -> Tensor {
    let (rows, cols) = (t.n_rows(), t.n_cols());
    let mut data = vec![0.0f32; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            data[j * rows + i] = t.data()[i * cols + j];
        }
    }
    Tensor::new(&data, &[cols, rows])
}
