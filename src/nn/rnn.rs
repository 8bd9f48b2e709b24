//! Single-layer recurrent summarizer.
//!
//! ```text
//! i_t = σ(W_i·[x_t, h_{t-1}])   // input gate
//! f_t = σ(W_f·[x_t, h_{t-1}])   // forget gate
//! g_t = tanh(W_g·[x_t, h_{t-1}]) // candidate cell
//! o_t = σ(W_o·[x_t, h_{t-1}])   // output gate
//! c_t = f_t * c_{t-1} + i_t * g_t
//! h_t = o_t * tanh(c_t)
//! ```
//!
//! The four gates share two fused projections (input-to-hidden with bias,
//! hidden-to-hidden without), split column-wise in i, f, g, o order.
//!
//! # Reference
//!
//! Hochreiter, S., & Schmidhuber, J. (1997). Long Short-Term Memory.
//! Neural Computation.

use super::linear::Linear;
use crate::module::Module;
use crate::tensor::Tensor;

/// Long Short-Term Memory layer over `(batch, seq_len, input_size)` input.
pub struct Lstm {
    input_size: usize,
    hidden_size: usize,
    /// Fused input projection `[input_size -> 4 * hidden_size]`, with bias
    w_ih: Linear,
    /// Fused recurrent projection `[hidden_size -> 4 * hidden_size]`
    w_hh: Linear,
}

impl Lstm {
    #[must_use]
    pub fn new(input_size: usize, hidden_size: usize, seed: Option<u64>) -> Self {
        Self {
            input_size,
            hidden_size,
            w_ih: Linear::new(input_size, 4 * hidden_size, seed),
            w_hh: Linear::without_bias(hidden_size, 4 * hidden_size, seed.map(|s| s ^ 1)),
        }
    }

    #[must_use]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// One timestep: `(x_t, h_{t-1}, c_{t-1}) -> (h_t, c_t)`.
    #[must_use]
    pub fn forward_step(&self, x: &Tensor, h: &Tensor, c: &Tensor) -> (Tensor, Tensor) {
        let gates = self.w_ih.forward(x).add(&self.w_hh.forward(h));
        let hs = self.hidden_size;

        let i = gates.slice_cols(0, hs).sigmoid();
        let f = gates.slice_cols(hs, hs).sigmoid();
        let g = gates.slice_cols(2 * hs, hs).tanh_act();
        let o = gates.slice_cols(3 * hs, hs).sigmoid();

        let c_new = f.mul(c).add(&i.mul(&g));
        let h_new = o.mul(&c_new.tanh_act());
        (h_new, c_new)
    }

    /// Run the full sequence; returns per-step hidden states
    /// `(batch, seq_len, hidden_size)` and the final hidden state
    /// `(batch, hidden_size)`.
    #[must_use]
    pub fn forward_sequence(&self, x: &Tensor) -> (Tensor, Tensor) {
        let (batch, seq_len) = (x.shape()[0], x.shape()[1]);

        let mut h = Tensor::zeros(&[batch, self.hidden_size]);
        let mut c = Tensor::zeros(&[batch, self.hidden_size]);
        let mut outputs = Vec::with_capacity(batch * seq_len * self.hidden_size);

        for t in 0..seq_len {
            let xt = slice_timestep(x, t);
            let (h_new, c_new) = self.forward_step(&xt, &h, &c);
            h = h_new;
            c = c_new;
            outputs.extend_from_slice(h.data());
        }

        // outputs are laid out (t, batch, hidden); restore (batch, t, hidden)
        let stacked = interleave_steps(&outputs, batch, seq_len, self.hidden_size);
        (stacked, h)
    }
}

impl Module for Lstm {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.w_ih.parameters();
        p.extend(self.w_hh.parameters());
        p
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.w_ih.parameters_mut();
        p.extend(self.w_hh.parameters_mut());
        p
    }
}

impl std::fmt::Debug for Lstm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lstm")
            .field("input_size", &self.input_size)
            .field("hidden_size", &self.hidden_size)
            .finish_non_exhaustive()
    }
}

/// Bidirectional wrapper: runs one [`Lstm`] forward and one over the
/// reversed sequence, concatenating hidden states per step.
pub struct Bidirectional {
    forward_rnn: Lstm,
    backward_rnn: Lstm,
    hidden_size: usize,
}

impl Bidirectional {
    #[must_use]
    pub fn new(input_size: usize, hidden_size: usize, seed: Option<u64>) -> Self {
        Self {
            forward_rnn: Lstm::new(input_size, hidden_size, seed),
            backward_rnn: Lstm::new(input_size, hidden_size, seed.map(|s| s.wrapping_add(1))),
            hidden_size,
        }
    }

    /// Per-direction hidden width.
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Concatenated output width (`2 * hidden_size`).
    #[must_use]
    pub fn output_size(&self) -> usize {
        self.hidden_size * 2
    }

    /// Returns `(batch, seq_len, 2 * hidden_size)` concatenated outputs.
    #[must_use]
    pub fn forward_sequence(&self, x: &Tensor) -> Tensor {
        let (batch, seq_len) = (x.shape()[0], x.shape()[1]);

        let (fwd_out, _) = self.forward_rnn.forward_sequence(x);
        let x_rev = reverse_sequence(x);
        let (bwd_rev, _) = self.backward_rnn.forward_sequence(&x_rev);
        let bwd_out = reverse_sequence(&bwd_rev);

        concat_last_dim(&fwd_out, &bwd_out, batch, seq_len, self.hidden_size)
    }
}

impl Module for Bidirectional {
    fn parameters(&self) -> Vec<&Tensor> {
        let mut p = self.forward_rnn.parameters();
        p.extend(self.backward_rnn.parameters());
        p
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut p = self.forward_rnn.parameters_mut();
        p.extend(self.backward_rnn.parameters_mut());
        p
    }
}

impl std::fmt::Debug for Bidirectional {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bidirectional")
            .field("hidden_size", &self.hidden_size)
            .finish_non_exhaustive()
    }
}

/// Take timestep `t` of a `(batch, seq, features)` tensor as `(batch, features)`.
fn slice_timestep(x: &Tensor, t: usize) -> Tensor {
    let (batch, seq_len, features) = (x.shape()[0], x.shape()[1], x.shape()[2]);
    let mut data = Vec::with_capacity(batch * features);
    for b in 0..batch {
        let start = b * seq_len * features + t * features;
        data.extend_from_slice(&x.data()[start..start + features]);
    }
    Tensor::new(&data, &[batch, features])
}

/// Reverse a `(batch, seq, features)` tensor along the sequence axis.
fn reverse_sequence(x: &Tensor) -> Tensor {
    let (batch, seq_len, features) = (x.shape()[0], x.shape()[1], x.shape()[2]);
    let mut data = vec![0.0f32; batch * seq_len * features];
    for b in 0..batch {
        for t in 0..seq_len {
            let src = b * seq_len * features + t * features;
            let dst = b * seq_len * features + (seq_len - 1 - t) * features;
            data[dst..dst + features].copy_from_slice(&x.data()[src..src + features]);
        }
    }
    Tensor::new(&data, &[batch, seq_len, features])
}

/// Reorder a (t, batch, hidden)-laid-out buffer into `(batch, seq, hidden)`.
fn interleave_steps(flat: &[f32], batch: usize, seq_len: usize, hidden: usize) -> Tensor {
    let mut data = vec![0.0f32; batch * seq_len * hidden];
    for t in 0..seq_len {
        for b in 0..batch {
            let src = t * batch * hidden + b * hidden;
            let dst = b * seq_len * hidden + t * hidden;
            data[dst..dst + hidden].copy_from_slice(&flat[src..src + hidden]);
        }
    }
    Tensor::new(&data, &[batch, seq_len, hidden])
}

/// Concatenate two `(batch, seq, hidden)` tensors along the last axis.
fn concat_last_dim(a: &Tensor, b: &Tensor, batch: usize, seq_len: usize, hidden: usize) -> Tensor {
    let out_size = hidden * 2;
    let mut data = vec![0.0f32; batch * seq_len * out_size];
    for ba in 0..batch {
        for t in 0..seq_len {
            let dst = ba * seq_len * out_size + t * out_size;
            let src = ba * seq_len * hidden + t * hidden;
            data[dst..dst + hidden].copy_from_slice(&a.data()[src..src + hidden]);
            data[dst + hidden..dst + out_size].copy_from_slice(&b.data()[src..src + hidden]);
        }
    }
    Tensor::new(&data, &[batch, seq_len, out_size])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lstm_step_shapes() {
        let lstm = Lstm::new(4, 8, Some(42));
        let x = Tensor::ones(&[2, 4]);
        let h = Tensor::zeros(&[2, 8]);
        let c = Tensor::zeros(&[2, 8]);

        let (h_new, c_new) = lstm.forward_step(&x, &h, &c);
        assert_eq!(h_new.shape(), &[2, 8]);
        assert_eq!(c_new.shape(), &[2, 8]);
    }

    #[test]
    fn test_lstm_sequence_shapes() {
        let lstm = Lstm::new(4, 8, Some(42));
        let x = Tensor::ones(&[2, 5, 4]);

        let (out, h_final) = lstm.forward_sequence(&x);
        assert_eq!(out.shape(), &[2, 5, 8]);
        assert_eq!(h_final.shape(), &[2, 8]);
    }

    #[test]
    fn test_final_state_matches_last_step() {
        let lstm = Lstm::new(3, 4, Some(7));
        let data: Vec<f32> = (0..2 * 4 * 3).map(|i| (i as f32 * 0.1).sin()).collect();
        let x = Tensor::new(&data, &[2, 4, 3]);

        let (out, h_final) = lstm.forward_sequence(&x);
        let last = slice_timestep(&out, 3);
        assert_eq!(last.data(), h_final.data());
    }

    #[test]
    fn test_hidden_state_bounded() {
        let lstm = Lstm::new(4, 8, Some(42));
        let x = Tensor::ones(&[1, 6, 4]);
        let (_, h) = lstm.forward_sequence(&x);
        for &v in h.data() {
            assert!((-1.0..=1.0).contains(&v), "hidden state bounded by tanh");
        }
    }

    #[test]
    fn test_lstm_parameters() {
        let lstm = Lstm::new(4, 8, Some(42));
        // w_ih weight + bias, w_hh weight
        assert_eq!(lstm.parameters().len(), 3);
        assert_eq!(
            lstm.num_parameters(),
            4 * 4 * 8 + 4 * 8 + 8 * 4 * 8 // in*4h + bias + h*4h
        );
    }

    #[test]
    fn test_bidirectional_shapes() {
        let bi = Bidirectional::new(4, 8, Some(42));
        let x = Tensor::ones(&[2, 5, 4]);
        let out = bi.forward_sequence(&x);
        assert_eq!(out.shape(), &[2, 5, 16]);
        assert_eq!(bi.output_size(), 16);
    }

    #[test]
    fn test_reverse_sequence() {
        let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 3, 2]);
        let rev = reverse_sequence(&x);
        assert_eq!(rev.data(), &[5.0, 6.0, 3.0, 4.0, 1.0, 2.0]);
    }

}
