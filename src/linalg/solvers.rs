//! Linear system solvers and matrix-vector primitives

use super::decompositions::{LuDecomposition, lu_decompose};
use super::helpers::validate_vector_len;
use super::Matrix;
use crate::error::Result;

/// Solve `A x = b` in place given the LU factors of `A`.
///
/// On entry `x` holds `b`; on return it holds the solution.
pub fn lu_solve_in_place(decomp: &LuDecomposition, x: &mut [f64]) {
    let n = decomp.dim();
    debug_assert_eq!(x.len(), n);
    let lu = decomp.lu.as_slice();

    // Apply row interchanges in the order they were made
    for (i, &p) in decomp.pivots.iter().enumerate() {
        if p != i {
            x.swap(i, p);
        }
    }

    // Forward substitution: L y = P b (L has unit diagonal)
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += lu[i * n + j] * x[j];
        }
        x[i] -= sum;
    }

    // Backward substitution: U x = y
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += lu[i * n + j] * x[j];
        }
        x[i] = (x[i] - sum) / lu[i * n + i];
    }
}

/// Solve `A x = b` given the LU factors of `A`
pub fn lu_solve(decomp: &LuDecomposition, b: &[f64]) -> Result<Vec<f64>> {
    validate_vector_len(b, decomp.dim())?;
    let mut x = b.to_vec();
    lu_solve_in_place(decomp, &mut x);
    Ok(x)
}

/// Solve `A x = b` using LU decomposition
pub fn solve(a: &Matrix, b: &[f64]) -> Result<Vec<f64>> {
    let decomp = lu_decompose(a)?;
    lu_solve(&decomp, b)
}

/// `out = M v`; lengths are a precondition
#[inline]
pub fn mat_vec_mul_into(m: &Matrix, v: &[f64], out: &mut [f64]) {
    debug_assert_eq!(m.cols(), v.len());
    debug_assert_eq!(m.rows(), out.len());
    for (o, row) in out.iter_mut().zip(m.iter_rows()) {
        *o = dot(row, v);
    }
}

/// `M v` as a fresh vector
pub fn mat_vec_mul(m: &Matrix, v: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; m.rows()];
    mat_vec_mul_into(m, v, &mut out);
    out
}

/// Dot product of two equal-length vectors
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
