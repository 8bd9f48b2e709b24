//! Parameter surface shared by all trainable components.
//!
//! Preprocessors and aggregators have different forward signatures, so this
//! trait only carries what they have in common: access to trainable
//! parameters, so an external optimizer can update them between forward
//! passes. Parameters are never mutated while a forward pass is in flight.

use crate::tensor::Tensor;

/// A component that owns trainable parameters.
pub trait Module {
    /// Borrow all trainable parameters.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Mutably borrow all trainable parameters (for the external optimizer).
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Total number of trainable scalar values.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Toy {
        w: Tensor,
        b: Tensor,
    }

    impl Module for Toy {
        fn parameters(&self) -> Vec<&Tensor> {
            vec![&self.w, &self.b]
        }
        fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
            vec![&mut self.w, &mut self.b]
        }
    }

    #[test]
    fn test_num_parameters() {
        let toy = Toy {
            w: Tensor::zeros(&[4, 3]),
            b: Tensor::zeros(&[3]),
        };
        assert_eq!(toy.num_parameters(), 15);
    }

    #[test]
    fn test_parameters_mut_allows_update() {
        let mut toy = Toy {
            w: Tensor::zeros(&[2, 2]),
            b: Tensor::zeros(&[2]),
        };
        for p in toy.parameters_mut() {
            for v in p.data_mut() {
                *v += 1.0;
            }
        }
        assert!(toy.parameters()[0].data().iter().all(|&v| v == 1.0));
    }
}
