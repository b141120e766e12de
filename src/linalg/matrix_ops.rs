//! Basic matrix operations (minor, determinant, inverse)

use super::decompositions::{LuDecomposition, lu_decompose};
use super::helpers::validate_square_matrix;
use super::solvers::lu_solve_in_place;
use super::{LAPLACE_MAX_DIM, Matrix, SINGULAR_TOLERANCE};
use crate::error::{Error, Result};

/// Algorithm used for determinants and inverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinalgMethod {
    /// Laplace expansion for the determinant, adjugate / determinant for the
    /// inverse. O(dim!) - only sensible for small matrices.
    Cofactor,
    /// LU decomposition with partial pivoting. O(dim^3).
    Lu,
    /// `Cofactor` up to [`LAPLACE_MAX_DIM`], `Lu` above it.
    #[default]
    Auto,
}

impl LinalgMethod {
    /// Concrete method for a matrix of dimension `dim`
    pub fn resolve(self, dim: usize) -> LinalgMethod {
        match self {
            LinalgMethod::Auto if dim <= LAPLACE_MAX_DIM => LinalgMethod::Cofactor,
            LinalgMethod::Auto => LinalgMethod::Lu,
            other => other,
        }
    }
}

impl std::str::FromStr for LinalgMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cofactor" | "adjugate" | "laplace" => Ok(LinalgMethod::Cofactor),
            "lu" => Ok(LinalgMethod::Lu),
            "auto" => Ok(LinalgMethod::Auto),
            other => Err(Error::invalid_argument(
                "method",
                format!("unknown linear algebra method '{other}' (expected auto, lu or cofactor)"),
            )),
        }
    }
}

/// Submatrix of `a` with row `p` and column `q` removed
pub fn minor(a: &Matrix, p: usize, q: usize) -> Matrix {
    let (m, n) = a.shape();
    let mut out = Matrix::zeros(m.saturating_sub(1), n.saturating_sub(1));
    let dst = out.as_mut_slice();
    let mut idx = 0;
    for (i, row) in a.iter_rows().enumerate() {
        if i == p {
            continue;
        }
        for (j, &v) in row.iter().enumerate() {
            if j == q {
                continue;
            }
            dst[idx] = v;
            idx += 1;
        }
    }
    out
}

/// Determinant by recursive Laplace expansion along the first row.
///
/// Cost grows as O(dim!); prefer [`determinant_lu`] beyond
/// [`LAPLACE_MAX_DIM`].
pub fn determinant_laplace(a: &Matrix) -> Result<f64> {
    validate_square_matrix(a)?;
    Ok(laplace(a))
}

fn laplace(a: &Matrix) -> f64 {
    let n = a.rows();
    match n {
        0 => 1.0,
        1 => a.get(0, 0),
        2 => a.get(0, 0) * a.get(1, 1) - a.get(0, 1) * a.get(1, 0),
        _ => {
            let mut det = 0.0;
            let mut sign = 1.0;
            for col in 0..n {
                let entry = a.get(0, col);
                if entry != 0.0 {
                    det += sign * entry * laplace(&minor(a, 0, col));
                }
                sign = -sign;
            }
            det
        }
    }
}

/// Determinant via LU decomposition.
///
/// A matrix the factorization rejects as singular has determinant 0.
pub fn determinant_lu(a: &Matrix) -> Result<f64> {
    let n = validate_square_matrix(a)?;
    if n == 0 {
        return Ok(1.0);
    }
    match lu_decompose(a) {
        Ok(decomp) => Ok(decomp.determinant()),
        Err(Error::SingularMatrix { .. }) => Ok(0.0),
        Err(e) => Err(e),
    }
}

/// Determinant with the given method
pub fn determinant(a: &Matrix, method: LinalgMethod) -> Result<f64> {
    let n = validate_square_matrix(a)?;
    match method.resolve(n) {
        LinalgMethod::Lu => determinant_lu(a),
        _ => determinant_laplace(a),
    }
}

/// Matrix of cofactors: `C[i][j] = (-1)^(i+j) * det(minor(a, i, j))`
pub fn cofactor_matrix(a: &Matrix) -> Result<Matrix> {
    let n = validate_square_matrix(a)?;
    let mut out = Matrix::zeros(n, n);
    if n == 1 {
        out.set(0, 0, 1.0);
        return Ok(out);
    }
    for i in 0..n {
        for j in 0..n {
            let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
            out.set(i, j, sign * laplace(&minor(a, i, j)));
        }
    }
    Ok(out)
}

/// Inverse as `adj(a) / det(a)`, where `adj(a)` is the transposed cofactor matrix.
///
/// Fails with [`Error::SingularMatrix`] when `|det(a)|` is at most
/// `(SINGULAR_TOLERANCE * max|a_ij|)^dim`, i.e. when the geometric mean of the
/// pivots would fall below the tolerance the LU path uses.
pub fn inverse_adjugate(a: &Matrix) -> Result<Matrix> {
    let n = validate_square_matrix(a)?;
    let det = laplace(a);
    let scale = a.as_slice().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let threshold = (SINGULAR_TOLERANCE * scale).powi(n as i32);
    if !det.is_finite() || (n > 0 && det.abs() <= threshold) {
        return Err(Error::SingularMatrix { dim: n });
    }

    let cofactors = cofactor_matrix(a)?;
    let mut inv = Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            inv.set(i, j, cofactors.get(j, i) / det);
        }
    }
    Ok(inv)
}

/// Inverse via LU decomposition: solve `A x = e_col` for every unit vector
/// and write each solution as a column of the inverse.
pub fn inverse_lu(a: &Matrix) -> Result<Matrix> {
    validate_square_matrix(a)?;
    let decomp = lu_decompose(a)?;
    Ok(invert_factored(&decomp))
}

fn invert_factored(decomp: &LuDecomposition) -> Matrix {
    let n = decomp.dim();
    let mut inv = Matrix::zeros(n, n);
    let mut column = vec![0.0; n];
    for col in 0..n {
        column.fill(0.0);
        column[col] = 1.0;
        lu_solve_in_place(decomp, &mut column);
        for (i, &v) in column.iter().enumerate() {
            inv.set(i, col, v);
        }
    }
    inv
}

/// Inverse with the given method
pub fn inverse(a: &Matrix, method: LinalgMethod) -> Result<Matrix> {
    let n = validate_square_matrix(a)?;
    match method.resolve(n) {
        LinalgMethod::Lu => inverse_lu(a),
        _ => inverse_adjugate(a),
    }
}

/// Inverse and determinant together, sharing one factorization on the LU path.
///
/// Returns [`Error::SingularMatrix`] if the matrix cannot be inverted.
pub fn inverse_and_determinant(a: &Matrix, method: LinalgMethod) -> Result<(Matrix, f64)> {
    let n = validate_square_matrix(a)?;
    match method.resolve(n) {
        LinalgMethod::Lu => {
            let decomp = lu_decompose(a)?;
            Ok((invert_factored(&decomp), decomp.determinant()))
        }
        _ => {
            let inv = inverse_adjugate(a)?;
            Ok((inv, laplace(a)))
        }
    }
}

/// Inverse plus `(sign, ln|det|)`.
///
/// The LU path sums log pivots, so a well-conditioned matrix whose
/// determinant is below `f64::MIN_POSITIVE` still reports a finite log.
pub fn inverse_and_log_determinant(
    a: &Matrix,
    method: LinalgMethod,
) -> Result<(Matrix, f64, f64)> {
    let n = validate_square_matrix(a)?;
    match method.resolve(n) {
        LinalgMethod::Lu => {
            let decomp = lu_decompose(a)?;
            let (sign, log_abs) = decomp.log_determinant();
            Ok((invert_factored(&decomp), sign, log_abs))
        }
        _ => {
            let inv = inverse_adjugate(a)?;
            let det = laplace(a);
            let sign = if det > 0.0 {
                1.0
            } else if det < 0.0 {
                -1.0
            } else {
                0.0
            };
            Ok((inv, sign, det.abs().ln()))
        }
    }
}
