//! Validation helpers for linear algebra operations

use super::Matrix;
use crate::error::{Error, Result};

/// Validate matrix is square, returning its dimension
pub fn validate_square_matrix(a: &Matrix) -> Result<usize> {
    let (m, n) = a.shape();
    if m != n {
        return Err(Error::ShapeMismatch {
            expected: vec![m, m],
            got: vec![m, n],
        });
    }
    Ok(n)
}

/// Validate a vector has the expected length
pub fn validate_vector_len(v: &[f64], expected: usize) -> Result<()> {
    if v.len() != expected {
        return Err(Error::shape_mismatch(&[expected], &[v.len()]));
    }
    Ok(())
}
