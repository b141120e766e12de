//! Multivariate normal density
//!
//! `N(x | mu, S) = (2 pi)^(-d/2) det(S)^(-1/2) exp(-1/2 (x - mu)^T S^-1 (x - mu))`
//!
//! A covariance that cannot be inverted (or whose determinant is not
//! positive) evaluates to density 0 instead of failing, so a collapsed
//! cluster simply stops claiming points.

use std::f64::consts::PI;

use crate::linalg::{LinalgMethod, Matrix, inverse_and_log_determinant};

/// Density of `x` under `N(mean, covariance)`, factoring the covariance on
/// every call.
///
/// This is the slow path; the EM engine uses [`GaussianCache`] so the
/// factorization happens once per cluster per iteration.
pub fn density(x: &[f64], mean: &[f64], covariance: &Matrix, method: LinalgMethod) -> f64 {
    let cache = GaussianCache::new(covariance, method);
    let mut scratch = vec![0.0; x.len()];
    cache.density_with_scratch(x, mean, &mut scratch)
}

/// Precomputed inverse covariance, log-determinant and normalizing constant.
#[derive(Debug, Clone)]
pub struct GaussianCache {
    inverse: Option<Matrix>,
    log_determinant: f64,
    log_norm: f64,
}

impl GaussianCache {
    /// Factor `covariance` once.
    ///
    /// The normalizer is built from `ln det(S)`, never from `det(S)` itself,
    /// so tight high-dimensional covariances keep a finite constant. A
    /// covariance that cannot be inverted or whose determinant is not
    /// positive produces a degenerate cache (density 0 everywhere); check
    /// [`GaussianCache::is_degenerate`].
    pub fn new(covariance: &Matrix, method: LinalgMethod) -> Self {
        let dim = covariance.rows();
        match inverse_and_log_determinant(covariance, method) {
            Ok((inv, sign, log_det)) if sign > 0.0 && log_det.is_finite() => {
                let log_norm = -0.5 * (dim as f64 * (2.0 * PI).ln() + log_det);
                Self {
                    inverse: Some(inv),
                    log_determinant: log_det,
                    log_norm,
                }
            }
            _ => Self::degenerate(),
        }
    }

    /// Cache that evaluates to zero density for every point
    pub fn degenerate() -> Self {
        Self {
            inverse: None,
            log_determinant: f64::NEG_INFINITY,
            log_norm: f64::NEG_INFINITY,
        }
    }

    /// Whether the covariance was singular
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.inverse.is_none()
    }

    /// det(covariance), 0 when degenerate.
    ///
    /// May underflow to 0 for a valid cache in high dimension; use
    /// [`GaussianCache::log_determinant`] for anything numeric.
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.log_determinant.exp()
    }

    /// ln det(covariance), `NEG_INFINITY` when degenerate
    #[inline]
    pub fn log_determinant(&self) -> f64 {
        self.log_determinant
    }

    /// Inverse covariance, if it exists
    #[inline]
    pub fn inverse(&self) -> Option<&Matrix> {
        self.inverse.as_ref()
    }

    /// Mahalanobis form `(x - mean)^T S^-1 (x - mean)`, using `scratch` (length d)
    /// for the difference vector. `None` when degenerate.
    #[inline]
    pub fn mahalanobis_with_scratch(
        &self,
        x: &[f64],
        mean: &[f64],
        scratch: &mut [f64],
    ) -> Option<f64> {
        let inv = self.inverse.as_ref()?;
        let d = x.len();
        debug_assert_eq!(mean.len(), d);
        debug_assert!(scratch.len() >= d);

        let diff = &mut scratch[..d];
        for ((o, &xi), &mi) in diff.iter_mut().zip(x).zip(mean) {
            *o = xi - mi;
        }

        let mut quad = 0.0;
        for (i, row) in inv.iter_rows().enumerate() {
            let mut acc = 0.0;
            for (&s, &dj) in row.iter().zip(diff.iter()) {
                acc += s * dj;
            }
            quad += diff[i] * acc;
        }
        Some(quad)
    }

    /// log N(x | mean, S); `NEG_INFINITY` when degenerate
    #[inline]
    pub fn log_density_with_scratch(&self, x: &[f64], mean: &[f64], scratch: &mut [f64]) -> f64 {
        match self.mahalanobis_with_scratch(x, mean, scratch) {
            Some(quad) => self.log_norm - 0.5 * quad,
            None => f64::NEG_INFINITY,
        }
    }

    /// N(x | mean, S) without allocating; 0 when degenerate
    #[inline]
    pub fn density_with_scratch(&self, x: &[f64], mean: &[f64], scratch: &mut [f64]) -> f64 {
        match self.mahalanobis_with_scratch(x, mean, scratch) {
            Some(quad) => (self.log_norm - 0.5 * quad).exp(),
            None => 0.0,
        }
    }

    /// N(x | mean, S), allocating a scratch buffer
    pub fn density(&self, x: &[f64], mean: &[f64]) -> f64 {
        let mut scratch = vec![0.0; x.len()];
        self.density_with_scratch(x, mean, &mut scratch)
    }

    /// log N(x | mean, S), allocating a scratch buffer
    pub fn log_density(&self, x: &[f64], mean: &[f64]) -> f64 {
        let mut scratch = vec![0.0; x.len()];
        self.log_density_with_scratch(x, mean, &mut scratch)
    }
}
