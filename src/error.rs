//! Error types for gmmr

use thiserror::Error;

/// Result type alias using gmmr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gmmr operations
///
/// Numerical edge cases inside the EM loop (a singular covariance, a cluster
/// whose responsibility mass collapses) never surface as errors: the density
/// evaluator and the M-step absorb them locally. Only structural problems
/// (bad shapes, bad arguments, unreadable input) are reported to callers.
#[derive(Error, Debug)]
pub enum Error {
    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Matrix is not invertible (pivot or determinant below tolerance)
    #[error("Matrix of dimension {dim} is singular")]
    SingularMatrix {
        /// Dimension of the square matrix
        dim: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Tabular input could not be parsed into a rectangular dataset
    #[error("Malformed input at line {line}: {reason}")]
    MalformedInput {
        /// 1-based line number in the input
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// Underlying I/O failure while reading or writing tabular data
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a malformed input error for the given 1-based line
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            reason: reason.into(),
        }
    }

    /// Whether this error came from a singular matrix
    pub fn is_singular(&self) -> bool {
        matches!(self, Self::SingularMatrix { .. })
    }
}
