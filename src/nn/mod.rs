//! Trainable building blocks.
//!
//! The preprocessors and aggregators are assembled from three primitives:
//! affine transforms ([`Linear`]), id-indexed lookup tables ([`Embedding`]),
//! and a single-layer recurrent summarizer ([`Lstm`] / [`Bidirectional`]).

mod embedding;
mod linear;
mod rnn;

pub use embedding::Embedding;
pub use linear::Linear;
pub use rnn::{Bidirectional, Lstm};
