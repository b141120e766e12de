//! LU decomposition with partial pivoting

use super::helpers::validate_square_matrix;
use super::{Matrix, SINGULAR_TOLERANCE};
use crate::error::{Error, Result};

/// Packed LU factors of a square matrix: `P A = L U`
///
/// `lu` holds U on and above the diagonal and the unit-diagonal L strictly
/// below it. `pivots[i]` is the row swapped with row `i` at step `i`
/// (LAPACK convention).
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    /// Packed L (below diagonal, implicit unit diagonal) and U factors
    pub lu: Matrix,
    /// Row interchanges applied at each elimination step
    pub pivots: Vec<usize>,
    /// Number of actual row swaps (determines the determinant sign)
    pub num_swaps: usize,
}

impl LuDecomposition {
    /// Dimension of the factored matrix
    pub fn dim(&self) -> usize {
        self.lu.rows()
    }

    /// det(A) = (-1)^num_swaps * prod(U[i,i])
    pub fn determinant(&self) -> f64 {
        let n = self.dim();
        let mut det = if self.num_swaps % 2 == 0 { 1.0 } else { -1.0 };
        for i in 0..n {
            det *= self.lu.get(i, i);
        }
        det
    }

    /// `(sign, ln|det(A)|)` summed from the pivots, so it stays finite when
    /// the plain product would underflow or overflow.
    pub fn log_determinant(&self) -> (f64, f64) {
        let mut sign = if self.num_swaps % 2 == 0 { 1.0 } else { -1.0 };
        let mut log_abs = 0.0;
        for i in 0..self.dim() {
            let u = self.lu.get(i, i);
            if u < 0.0 {
                sign = -sign;
            }
            log_abs += u.abs().ln();
        }
        (sign, log_abs)
    }
}

/// LU decomposition with partial pivoting (Doolittle algorithm)
///
/// Fails with [`Error::SingularMatrix`] when the best available pivot in a
/// column is smaller than [`SINGULAR_TOLERANCE`] in magnitude.
pub fn lu_decompose(a: &Matrix) -> Result<LuDecomposition> {
    let n = validate_square_matrix(a)?;

    // Working copy, factored in place
    let mut lu = a.clone();
    let data = lu.as_mut_slice();
    let mut pivots = vec![0usize; n];
    let mut num_swaps = 0usize;

    for col in 0..n {
        // Find pivot: max absolute value in column col, rows col..n
        let mut pivot_row = col;
        let mut max_val = data[col * n + col].abs();
        for row in (col + 1)..n {
            let val = data[row * n + col].abs();
            if val > max_val {
                max_val = val;
                pivot_row = row;
            }
        }

        if max_val < SINGULAR_TOLERANCE {
            return Err(Error::SingularMatrix { dim: n });
        }

        pivots[col] = pivot_row;
        if pivot_row != col {
            for j in 0..n {
                data.swap(col * n + j, pivot_row * n + j);
            }
            num_swaps += 1;
        }

        let pivot = data[col * n + col];

        // Compute multipliers (L column)
        for row in (col + 1)..n {
            data[row * n + col] /= pivot;
        }

        // Update trailing submatrix
        for row in (col + 1)..n {
            let multiplier = data[row * n + col];
            if multiplier == 0.0 {
                continue;
            }
            for j in (col + 1)..n {
                data[row * n + j] -= multiplier * data[col * n + j];
            }
        }
    }

    Ok(LuDecomposition {
        lu,
        pivots,
        num_swaps,
    })
}
