//! Tuning knobs for an EM run

use crate::linalg::LinalgMethod;
use crate::parallel::Parallelism;

/// Default iteration cap
pub const DEFAULT_MAX_ITER: usize = 200;

/// Default log-likelihood change below which EM stops
pub const DEFAULT_TOL: f64 = 1e-6;

/// Default value added to every covariance diagonal after the M-step
pub const DEFAULT_REG_COVAR: f64 = 1e-6;

/// Guard added to every divisor that may be zero (row sums, cluster mass,
/// mixture densities inside the logarithm)
pub const RESPONSIBILITY_EPSILON: f64 = 1e-18;

/// Options for fitting a Gaussian mixture with EM.
///
/// ```
/// use gmmr::linalg::LinalgMethod;
/// use gmmr::mixture::EmOptions;
///
/// let options = EmOptions::default()
///     .with_max_iter(50)
///     .with_seed(7)
///     .with_method(LinalgMethod::Lu);
/// assert_eq!(options.max_iter, 50);
/// ```
#[derive(Debug, Clone)]
pub struct EmOptions {
    /// Maximum number of EM iterations
    pub max_iter: usize,
    /// Convergence threshold on |ll - prev_ll|
    pub tol: f64,
    /// Added to the covariance diagonal after every M-step
    pub reg_covar: f64,
    /// Divisor guard for responsibilities and cluster mass
    pub responsibility_epsilon: f64,
    /// Inversion/determinant algorithm for the covariance matrices
    pub method: LinalgMethod,
    /// Factor each covariance once per iteration instead of once per density call
    pub cache_inverse: bool,
    /// Seed for the initializer; `None` draws from the OS
    pub seed: Option<u64>,
    /// Shared-memory execution of the point loops
    pub parallelism: Parallelism,
}

impl Default for EmOptions {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            reg_covar: DEFAULT_REG_COVAR,
            responsibility_epsilon: RESPONSIBILITY_EPSILON,
            method: LinalgMethod::Auto,
            cache_inverse: true,
            seed: None,
            parallelism: Parallelism::default(),
        }
    }
}

impl EmOptions {
    /// Set the iteration cap
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the covariance regularization
    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
        self
    }

    /// Set the divisor guard for responsibilities, cluster mass and `ln p`
    pub fn with_responsibility_epsilon(mut self, epsilon: f64) -> Self {
        self.responsibility_epsilon = epsilon;
        self
    }

    /// Set the linear algebra method
    pub fn with_method(mut self, method: LinalgMethod) -> Self {
        self.method = method;
        self
    }

    /// Enable or disable the per-iteration inverse cache
    pub fn with_cache_inverse(mut self, cache_inverse: bool) -> Self {
        self.cache_inverse = cache_inverse;
        self
    }

    /// Fix the initializer seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Choose sequential or rayon point loops
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Shorthand for `with_parallelism(Parallelism::Sequential)`
    pub fn sequential(self) -> Self {
        self.with_parallelism(Parallelism::Sequential)
    }
}
