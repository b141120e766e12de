//! Mixture parameters: one mean, covariance and weight per component

use crate::error::{Error, Result};
use crate::gaussian::GaussianCache;
use crate::linalg::{LinalgMethod, Matrix};
use crate::parallel::Parallelism;
use crate::parallel::reduce::for_each_mut;

/// One Gaussian component.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Mean vector (length D)
    pub mean: Vec<f64>,
    /// Full D×D covariance
    pub covariance: Matrix,
    /// Mixing weight
    pub weight: f64,
    /// Sum of this component's responsibilities from the last E-step
    pub responsibility_mass: f64,
    cache: Option<GaussianCache>,
}

impl Cluster {
    /// Component with no cached factorization
    pub fn new(mean: Vec<f64>, covariance: Matrix, weight: f64) -> Self {
        Self {
            mean,
            covariance,
            weight,
            responsibility_mass: 0.0,
            cache: None,
        }
    }

    /// Dimension of the mean
    #[inline]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Cached inverse/determinant, if refreshed since the covariance last changed
    #[inline]
    pub fn cache(&self) -> Option<&GaussianCache> {
        self.cache.as_ref()
    }

    /// Re-factor the covariance. Returns `true` when it is singular.
    pub fn refresh_cache(&mut self, method: LinalgMethod) -> bool {
        let cache = GaussianCache::new(&self.covariance, method);
        let degenerate = cache.is_degenerate();
        self.cache = Some(cache);
        degenerate
    }

    /// Drop the cached factorization
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Whether the current covariance cannot be inverted
    pub fn is_degenerate(&self, method: LinalgMethod) -> bool {
        match &self.cache {
            Some(cache) => cache.is_degenerate(),
            None => GaussianCache::new(&self.covariance, method).is_degenerate(),
        }
    }

    /// N(x | mean, covariance), through the cache when present
    #[inline]
    pub fn density_with_scratch(&self, x: &[f64], method: LinalgMethod, scratch: &mut [f64]) -> f64 {
        match &self.cache {
            Some(cache) => cache.density_with_scratch(x, &self.mean, scratch),
            None => GaussianCache::new(&self.covariance, method).density_with_scratch(
                x,
                &self.mean,
                scratch,
            ),
        }
    }
}

/// The full set of mixture components.
#[derive(Debug, Clone)]
pub struct MixtureParams {
    clusters: Vec<Cluster>,
    dim: usize,
    method: LinalgMethod,
}

impl MixtureParams {
    /// Check that every component has a length-D mean and a D×D covariance.
    pub fn new(clusters: Vec<Cluster>, method: LinalgMethod) -> Result<Self> {
        let dim = match clusters.first() {
            Some(c) => c.dim(),
            None => return Err(Error::invalid_argument("clusters", "at least one cluster required")),
        };
        for c in &clusters {
            if c.dim() != dim {
                return Err(Error::shape_mismatch(&[dim], &[c.dim()]));
            }
            if c.covariance.shape() != (dim, dim) {
                return Err(Error::shape_mismatch(
                    &[dim, dim],
                    &[c.covariance.rows(), c.covariance.cols()],
                ));
            }
        }
        Ok(Self {
            clusters,
            dim,
            method,
        })
    }

    /// Number of components
    #[inline]
    pub fn k(&self) -> usize {
        self.clusters.len()
    }

    /// Dimension of each component
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Linear algebra method used for densities
    #[inline]
    pub fn method(&self) -> LinalgMethod {
        self.method
    }

    pub(crate) fn set_method(&mut self, method: LinalgMethod) {
        self.method = method;
    }

    /// All components
    #[inline]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// All components, mutably. Callers that change a covariance must call
    /// [`MixtureParams::refresh_caches`] or [`MixtureParams::clear_caches`].
    #[inline]
    pub fn clusters_mut(&mut self) -> &mut [Cluster] {
        &mut self.clusters
    }

    /// Consume into the component list
    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters
    }

    /// Mixing weights in component order
    pub fn weights(&self) -> Vec<f64> {
        self.clusters.iter().map(|c| c.weight).collect()
    }

    /// Means in component order
    pub fn means(&self) -> Vec<&[f64]> {
        self.clusters.iter().map(|c| c.mean.as_slice()).collect()
    }

    /// Sum of the mixing weights
    pub fn total_weight(&self) -> f64 {
        self.clusters.iter().map(|c| c.weight).sum()
    }

    /// Re-factor every covariance, one component per task. Returns the
    /// number of singular covariances.
    pub fn refresh_caches(&mut self, parallelism: Parallelism) -> usize {
        let method = self.method;
        for_each_mut(parallelism, &mut self.clusters, |_, c| {
            c.refresh_cache(method);
        });
        self.clusters
            .iter()
            .filter(|c| c.cache.as_ref().is_some_and(GaussianCache::is_degenerate))
            .count()
    }

    /// Drop every cached factorization
    pub fn clear_caches(&mut self) {
        for c in &mut self.clusters {
            c.clear_cache();
        }
    }

    /// Write `w_k * N(x | k)` into `out` (length K) and return their sum.
    ///
    /// `scratch` must hold at least D values.
    pub fn weighted_densities(&self, x: &[f64], out: &mut [f64], scratch: &mut [f64]) -> f64 {
        debug_assert_eq!(out.len(), self.k());
        let mut sum = 0.0;
        for (o, c) in out.iter_mut().zip(&self.clusters) {
            *o = c.weight * c.density_with_scratch(x, self.method, scratch);
            sum += *o;
        }
        sum
    }

    /// `sum_k w_k * N(x | k)`
    pub fn mixture_density(&self, x: &[f64], scratch: &mut [f64]) -> f64 {
        self.clusters
            .iter()
            .map(|c| c.weight * c.density_with_scratch(x, self.method, scratch))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_unit_clusters() -> MixtureParams {
        MixtureParams::new(
            vec![
                Cluster::new(vec![0.0, 0.0], Matrix::identity(2), 0.25),
                Cluster::new(vec![3.0, 0.0], Matrix::identity(2), 0.75),
            ],
            LinalgMethod::Auto,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_mismatched_dims() {
        let err = MixtureParams::new(
            vec![
                Cluster::new(vec![0.0, 0.0], Matrix::identity(2), 0.5),
                Cluster::new(vec![0.0], Matrix::identity(1), 0.5),
            ],
            LinalgMethod::Auto,
        );
        assert!(err.is_err());
        let err = MixtureParams::new(
            vec![Cluster::new(vec![0.0, 0.0], Matrix::identity(3), 1.0)],
            LinalgMethod::Auto,
        );
        assert!(err.is_err());
        assert!(MixtureParams::new(vec![], LinalgMethod::Auto).is_err());
    }

    #[test]
    fn test_weighted_densities_sum() {
        let params = two_unit_clusters();
        let mut out = [0.0; 2];
        let mut scratch = [0.0; 2];
        let sum = params.weighted_densities(&[0.0, 0.0], &mut out, &mut scratch);
        assert!((sum - out[0] - out[1]).abs() < 1e-15);
        assert!(out[0] > out[1]);
        assert!((params.mixture_density(&[0.0, 0.0], &mut scratch) - sum).abs() < 1e-15);
        assert!((params.total_weight() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_cached_and_uncached_densities_agree() {
        let mut params = two_unit_clusters();
        let mut scratch = [0.0; 2];
        let uncached = params.mixture_density(&[1.0, 0.5], &mut scratch);
        assert_eq!(params.refresh_caches(Parallelism::Sequential), 0);
        let cached = params.mixture_density(&[1.0, 0.5], &mut scratch);
        assert!((cached - uncached).abs() < 1e-15);
    }

    #[test]
    fn test_refresh_counts_singular() {
        let mut params = two_unit_clusters();
        params.clusters_mut()[1].covariance = Matrix::zeros(2, 2);
        assert_eq!(params.refresh_caches(Parallelism::default()), 1);
        assert!(params.clusters()[1].is_degenerate(LinalgMethod::Auto));
        let mut scratch = [0.0; 2];
        assert_eq!(
            params.clusters()[1].density_with_scratch(&[3.0, 0.0], LinalgMethod::Auto, &mut scratch),
            0.0
        );
    }
}
