//! # gmmr
//!
//! **Gaussian mixture models fitted by Expectation-Maximization, in pure Rust.**
//!
//! gmmr fits K full-covariance Gaussian components to N points in D
//! dimensions and assigns each point a hard label. The dense linear algebra
//! behind the Gaussian density (Laplace/adjugate and LU with partial
//! pivoting) is written from scratch; there is no BLAS or LAPACK dependency.
//!
//! ## Features
//!
//! - **Linear algebra**: row-major [`linalg::Matrix`], determinants, inverses, LU solves
//! - **EM engine**: E-step, M-step and log-likelihood with per-iteration
//!   covariance factorization caching
//! - **Shared memory**: point loops on rayon with partial-then-combine reductions
//! - **Data parallel**: shard the points over ranks that all-reduce cluster statistics
//! - **I/O**: CSV datasets in, labelled CSV out
//!
//! ## Quick Start
//!
//! ```
//! use gmmr::prelude::*;
//!
//! let data = Matrix::from_rows(&[[0.0], [0.3], [8.0], [8.3]])?;
//! let result = fit(&data, 2, &EmOptions::default().with_seed(11))?;
//! assert_eq!(result.labels.len(), 4);
//! assert!((result.weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
//! # Ok::<(), gmmr::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded E-step / M-step kernels

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod gaussian;
pub mod io;
pub mod linalg;
pub mod mixture;
pub mod parallel;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::gaussian::GaussianCache;
    pub use crate::linalg::{LinalgMethod, Matrix};
    pub use crate::mixture::{
        Cluster, EmEngine, EmOptions, EmState, FitStats, GmmFit, MixtureParams, fit,
        fit_with_stats,
    };
    pub use crate::parallel::Parallelism;
    pub use crate::parallel::distributed::{Communicator, SingleProcess};
}
