//! Error types for vecindario operations.
//!
//! The forward passes in this crate are deterministic-shape pure functions:
//! nothing is retried or recovered internally, every failure propagates to
//! the caller. Three situations are distinguished — component wiring that is
//! wrong at construction time, call arguments that would corrupt a forward
//! pass, and feature blocks whose width disagrees with the configured one.

use std::fmt;

/// Main error type for vecindario operations.
///
/// # Examples
///
/// ```
/// use vecindario::error::VecindarioError;
///
/// let err = VecindarioError::ShapeMismatch {
///     expected: "8 feature columns".to_string(),
///     actual: "5 feature columns".to_string(),
/// };
/// assert!(err.to_string().contains("shape mismatch"));
/// ```
#[derive(Debug)]
pub enum VecindarioError {
    /// Components wired together with incompatible widths, or a component
    /// configured with internally inconsistent settings. Raised at
    /// construction time, never mid-forward.
    Configuration {
        /// What is inconsistent
        message: String,
    },

    /// A call-time argument that would make the computation meaningless,
    /// detected before any numeric work (zero sample counts, zero-degree
    /// nodes, ragged neighbor batches).
    InvalidArgument {
        /// Argument name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// A tensor whose dimensions don't match what the component was
    /// configured for.
    ShapeMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },
}

impl fmt::Display for VecindarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VecindarioError::Configuration { message } => {
                write!(f, "Invalid configuration: {message}")
            }
            VecindarioError::InvalidArgument {
                param,
                value,
                constraint,
            } => {
                write!(f, "Invalid argument {param} = {value}: {constraint}")
            }
            VecindarioError::ShapeMismatch { expected, actual } => {
                write!(f, "Tensor shape mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for VecindarioError {}

/// Convenience result type for vecindario operations.
pub type Result<T> = std::result::Result<T, VecindarioError>;
