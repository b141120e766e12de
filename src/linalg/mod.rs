//! Dense linear algebra on row-major `f64` matrices
//!
//! Everything the Gaussian density needs, written from scratch:
//!
//! - [`Matrix`]: one contiguous row-major buffer with row/column accessors
//! - [`lu_decompose`]: Doolittle LU with partial pivoting
//! - [`determinant`]: Laplace expansion or LU pivot product
//! - [`inverse`]: adjugate / determinant or LU + per-column substitution
//! - [`mat_vec_mul`], [`dot`]: straight-line primitives
//!
//! # Choosing a method
//!
//! Laplace expansion and the adjugate inverse cost O(dim!) and are only
//! practical for small matrices. [`LinalgMethod::Auto`] switches to LU above
//! [`LAPLACE_MAX_DIM`].
//!
//! ```
//! use gmmr::linalg::{LinalgMethod, Matrix, inverse};
//!
//! let a = Matrix::from_rows(&[[4.0, 7.0], [2.0, 6.0]]).unwrap();
//! let inv = inverse(&a, LinalgMethod::Lu).unwrap();
//! let eye = a.matmul(&inv).unwrap();
//! assert!(eye.max_abs_diff(&Matrix::identity(2)) < 1e-12);
//! ```

mod decompositions;
mod helpers;
mod matrix;
mod matrix_ops;
mod solvers;


pub use decompositions::{LuDecomposition, lu_decompose};
pub use helpers::{validate_square_matrix, validate_vector_len};
pub use matrix::Matrix;
pub use matrix_ops::{
    LinalgMethod, cofactor_matrix, determinant, determinant_laplace, determinant_lu, inverse,
    inverse_adjugate, inverse_and_determinant, inverse_and_log_determinant, inverse_lu,
    minor,
};
pub use solvers::{dot, lu_solve, lu_solve_in_place, mat_vec_mul, mat_vec_mul_into, solve};

/// Pivot magnitude below which a matrix is treated as singular
pub const SINGULAR_TOLERANCE: f64 = 1e-8;

/// Largest dimension for which `LinalgMethod::Auto` uses Laplace / adjugate
pub const LAPLACE_MAX_DIM: usize = 8;
