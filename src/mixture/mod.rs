//! Gaussian mixture models fitted with Expectation-Maximization
//!
//! - [`initialize`]: farthest-point means, global covariance, equal weights
//! - [`EmEngine`]: E-step, M-step and log-likelihood over one dataset or shard
//! - [`fit`]: initialize and iterate until converged or capped
//!
//! Only full covariances are supported.
//!
//! ```
//! use gmmr::linalg::Matrix;
//! use gmmr::mixture::{EmOptions, FitStats, fit_with_stats};
//!
//! let data = Matrix::from_rows(&[
//!     [0.0, 0.1], [0.2, -0.1], [-0.1, 0.0],
//!     [5.0, 5.1], [5.2, 4.9], [4.9, 5.0],
//! ]).unwrap();
//! let mut stats = FitStats::default();
//! let result = fit_with_stats(&data, 2, &EmOptions::default().with_seed(0), &mut stats).unwrap();
//! assert_eq!(result.labels[0], result.labels[1]);
//! assert!(stats.iterations >= 1);
//! ```

mod em;
mod init;
mod options;
mod params;
mod stats;
pub mod validation;

pub use em::{EmEngine, EmState, GmmFit, fit, fit_with_stats};
pub use init::{column_means, empirical_covariance, farthest_points, initialize, initialize_with_means};
pub use options::{
    DEFAULT_MAX_ITER, DEFAULT_REG_COVAR, DEFAULT_TOL, EmOptions, RESPONSIBILITY_EPSILON,
};
pub use params::{Cluster, MixtureParams};
pub use stats::FitStats;
