//! The EM iteration engine
//!
//! One iteration is E-step, M-step, then the log-likelihood under the updated
//! parameters. Every point loop runs through [`crate::parallel::reduce`], and
//! every cross-point sum goes through the engine's [`Communicator`], so the same
//! code serves a single process, a rayon pool and a group of ranks.

use std::fmt;

use tracing::{debug, info, warn};

use super::init::initialize;
use super::stats::timed;
use super::validation::{validate_data, validate_n_components, validate_options};
use super::{Cluster, EmOptions, FitStats, MixtureParams};
use crate::error::{Error, Result};
use crate::linalg::Matrix;
use crate::parallel::distributed::{Communicator, SingleProcess};
use crate::parallel::reduce::{Accumulator, PartialSums, fold_points, fold_rows_mut, map_rows};

/// Lifecycle of an [`EmEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmState {
    /// Parameters set, no iteration run yet
    Initialized,
    /// At least one iteration run, not stopped
    Iterating,
    /// Stopped because the log-likelihood change fell below `tol`
    Converged,
    /// Stopped at `max_iter` without converging
    MaxIterReached,
    /// Labels derived from the final responsibilities
    Labeled,
    /// Results handed to the caller
    Done,
}

impl EmState {
    /// Whether iteration has stopped
    pub fn is_stopped(self) -> bool {
        !matches!(self, EmState::Initialized | EmState::Iterating)
    }
}

impl fmt::Display for EmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmState::Initialized => "initialized",
            EmState::Iterating => "iterating",
            EmState::Converged => "converged",
            EmState::MaxIterReached => "max-iter-reached",
            EmState::Labeled => "labeled",
            EmState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Per-worker running sums plus a scratch buffer for density evaluation.
#[derive(Debug)]
struct ClusterAccumulator {
    sums: PartialSums,
    scratch: Vec<f64>,
}

impl ClusterAccumulator {
    fn new(len: usize, dim: usize) -> Self {
        Self {
            sums: PartialSums::new(len),
            scratch: vec![0.0; dim],
        }
    }
}

impl Accumulator for ClusterAccumulator {
    fn merge(self, other: Self) -> Self {
        Self {
            sums: self.sums.merge(other.sums),
            scratch: self.scratch,
        }
    }
}

/// Turn a row of weighted densities into responsibilities in place.
///
/// A row whose densities are all zero (the point is unreachable from every
/// component) is spread uniformly so it still sums to one.
#[inline]
fn normalize_row(row: &mut [f64], total: f64, eps: f64) {
    if total > 0.0 && total.is_finite() {
        let denom = total + eps;
        for r in row.iter_mut() {
            *r /= denom;
        }
    } else {
        let uniform = 1.0 / row.len() as f64;
        row.fill(uniform);
    }
}

/// Index of the largest value; ties go to the lowest index.
#[inline]
fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (j, &v) in row.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = j;
        }
    }
    best
}

/// Number of entries in the upper triangle (diagonal included) of a `d x d` matrix
#[inline]
fn upper_len(d: usize) -> usize {
    d * (d + 1) / 2
}

/// EM state for one dataset (or one shard of it).
///
/// Holds the parameters and the N×K responsibility matrix, which is
/// allocated once and overwritten every iteration.
pub struct EmEngine<'a, C: Communicator = SingleProcess> {
    data: &'a Matrix,
    params: MixtureParams,
    responsibilities: Matrix,
    local_mass: Vec<f64>,
    options: EmOptions,
    comm: &'a C,
    total_points: usize,
    state: EmState,
    prev_ll: f64,
    ll: f64,
    n_iter: usize,
}

impl<'a> EmEngine<'a, SingleProcess> {
    /// Engine over the whole dataset in this process
    pub fn new(data: &'a Matrix, params: MixtureParams, options: EmOptions) -> Result<Self> {
        Self::with_communicator(data, params, options, &SingleProcess)
    }
}

impl<'a, C: Communicator> EmEngine<'a, C> {
    /// Engine over this rank's shard.
    ///
    /// Collective: every rank of `comm` must call this. Validation failures
    /// are shared, so either every rank gets an engine or every rank gets an
    /// error.
    pub fn with_communicator(
        data: &'a Matrix,
        mut params: MixtureParams,
        options: EmOptions,
        comm: &'a C,
    ) -> Result<Self> {
        let local = validate_options(&options, "EmEngine")
            .and_then(|_| validate_data(data, comm.size() > 1, "EmEngine"))
            .and_then(|_| {
                if data.cols() == params.dim() {
                    Ok(())
                } else {
                    Err(Error::shape_mismatch(&[params.dim()], &[data.cols()]))
                }
            });

        let mut buf = [data.rows() as f64, if local.is_err() { 1.0 } else { 0.0 }];
        comm.all_reduce_sum(&mut buf);
        local?;
        if buf[1] > 0.0 {
            return Err(Error::invalid_argument(
                "data",
                format!("validation failed on {} other rank(s)", buf[1] as usize),
            ));
        }
        let total_points = buf[0] as usize;
        validate_n_components(params.k(), total_points, "EmEngine")?;

        params.set_method(options.method);
        if options.cache_inverse {
            params.refresh_caches(options.parallelism);
        } else {
            params.clear_caches();
        }

        let k = params.k();
        Ok(Self {
            data,
            responsibilities: Matrix::zeros(data.rows(), k),
            local_mass: vec![0.0; k],
            params,
            options,
            comm,
            total_points,
            state: EmState::Initialized,
            prev_ll: f64::NEG_INFINITY,
            ll: f64::NEG_INFINITY,
            n_iter: 0,
        })
    }

    /// Current parameters
    pub fn params(&self) -> &MixtureParams {
        &self.params
    }

    /// Responsibilities from the last E-step (local rows only)
    pub fn responsibilities(&self) -> &Matrix {
        &self.responsibilities
    }

    /// Current lifecycle state
    pub fn state(&self) -> EmState {
        self.state
    }

    /// Iterations completed
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Log-likelihood after the last iteration (`-inf` before the first)
    pub fn current_log_likelihood(&self) -> f64 {
        self.ll
    }

    /// Number of points across all ranks
    pub fn total_points(&self) -> usize {
        self.total_points
    }

    /// Options in effect
    pub fn options(&self) -> &EmOptions {
        &self.options
    }

    /// Recompute every responsibility from the current parameters and the
    /// local responsibility mass of each component.
    pub fn e_step(&mut self) {
        let k = self.params.k();
        let d = self.params.dim();
        let eps = self.options.responsibility_epsilon;
        let params = &self.params;
        let data = self.data;

        let acc = fold_rows_mut(
            self.options.parallelism,
            self.responsibilities.as_mut_slice(),
            k,
            || ClusterAccumulator::new(k, d),
            |acc, i, row| {
                let total = params.weighted_densities(data.row(i), row, &mut acc.scratch);
                normalize_row(row, total, eps);
                for (j, &r) in row.iter().enumerate() {
                    acc.sums.add(j, r);
                }
            },
        );
        self.local_mass = acc.sums.into_vec();
    }

    /// Update weights, means and covariances from the responsibilities.
    ///
    /// Means are reduced (and all-reduced) first; covariances are accumulated
    /// only afterwards, against the new means. Returns the number of
    /// covariances that turned out singular.
    pub fn m_step(&mut self) -> usize {
        let k = self.params.k();
        let d = self.params.dim();
        let eps = self.options.responsibility_epsilon;
        let parallelism = self.options.parallelism;
        let data = self.data;
        let resp = &self.responsibilities;

        // mass (K) followed by weighted point sums (K x D)
        let mut sums = fold_points(
            parallelism,
            data.rows(),
            || ClusterAccumulator::new(k * d, 0),
            |acc, i| {
                let x = data.row(i);
                for (j, &r) in resp.row(i).iter().enumerate() {
                    if r == 0.0 {
                        continue;
                    }
                    for (t, &xt) in x.iter().enumerate() {
                        acc.sums.add(j * d + t, r * xt);
                    }
                }
            },
        )
        .sums
        .into_vec();
        let mut buf = Vec::with_capacity(k + k * d);
        buf.extend_from_slice(&self.local_mass);
        buf.append(&mut sums);
        self.comm.all_reduce_sum(&mut buf);

        let (mass, mean_sums) = buf.split_at(k);
        let n_total = self.total_points as f64;
        for (j, cluster) in self.params.clusters_mut().iter_mut().enumerate() {
            let nk = mass[j];
            cluster.responsibility_mass = nk;
            cluster.weight = nk / n_total;
            for (t, m) in cluster.mean.iter_mut().enumerate() {
                *m = mean_sums[j * d + t] / (nk + eps);
            }
        }

        // weighted scatter around the new means, upper triangle only
        let tri = upper_len(d);
        let clusters = self.params.clusters();
        let mut cov_sums = fold_points(
            parallelism,
            data.rows(),
            || ClusterAccumulator::new(k * tri, d),
            |acc, i| {
                let x = data.row(i);
                for (j, &r) in resp.row(i).iter().enumerate() {
                    if r == 0.0 {
                        continue;
                    }
                    for ((o, &xt), &mt) in acc.scratch.iter_mut().zip(x).zip(&clusters[j].mean) {
                        *o = xt - mt;
                    }
                    let mut idx = j * tri;
                    for a in 0..d {
                        let ra = r * acc.scratch[a];
                        for b in a..d {
                            acc.sums.add(idx, ra * acc.scratch[b]);
                            idx += 1;
                        }
                    }
                }
            },
        )
        .sums;
        self.comm.all_reduce_sum(cov_sums.as_mut_slice());

        let cov_sums = cov_sums.as_slice();
        let reg = self.options.reg_covar;
        for (j, cluster) in self.params.clusters_mut().iter_mut().enumerate() {
            let denom = cluster.responsibility_mass + eps;
            let mut idx = j * tri;
            for a in 0..d {
                for b in a..d {
                    let v = cov_sums[idx] / denom;
                    cluster.covariance[(a, b)] = v;
                    cluster.covariance[(b, a)] = v;
                    idx += 1;
                }
            }
            cluster.covariance.add_to_diagonal(reg);
        }

        let singular = if self.options.cache_inverse {
            self.params.refresh_caches(parallelism)
        } else {
            let method = self.params.method();
            self.params
                .clusters()
                .iter()
                .filter(|c| c.is_degenerate(method))
                .count()
        };
        if singular > 0 && self.comm.is_root() {
            let method = self.params.method();
            for (j, c) in self.params.clusters().iter().enumerate() {
                if c.is_degenerate(method) {
                    warn!(
                        cluster = j,
                        iteration = self.n_iter + 1,
                        mass = c.responsibility_mass,
                        "singular covariance; cluster density set to zero"
                    );
                }
            }
        }
        singular
    }

    /// `sum_n ln(sum_k w_k N(x_n | k) + eps)` over all ranks
    pub fn log_likelihood(&self) -> f64 {
        let eps = self.options.responsibility_epsilon;
        let params = &self.params;
        let data = self.data;
        let local = fold_points(
            self.options.parallelism,
            data.rows(),
            || ClusterAccumulator::new(1, params.dim()),
            |acc, i| {
                let p = params.mixture_density(data.row(i), &mut acc.scratch);
                acc.sums.add(0, (p + eps).ln());
            },
        );
        self.comm.all_reduce_scalar(local.sums.as_slice()[0])
    }

    /// Run one iteration. Returns `true` while more iterations are needed.
    ///
    /// The stop decision is made on rank 0 and broadcast, so every rank
    /// stops after the same iteration.
    pub fn step(&mut self, stats: &mut FitStats) -> bool {
        if self.state.is_stopped() {
            return false;
        }
        self.state = EmState::Iterating;

        timed(&mut stats.e_step_time, || self.e_step());
        let singular = timed(&mut stats.m_step_time, || self.m_step());
        let ll = timed(&mut stats.likelihood_time, || self.log_likelihood());

        self.n_iter += 1;
        stats.iterations += 1;
        stats.singular_events += singular;
        stats.log_likelihoods.push(ll);

        self.prev_ll = self.ll;
        self.ll = ll;
        let delta = (ll - self.prev_ll).abs();
        let converged = self.comm.broadcast_flag(0, delta < self.options.tol);
        debug!(iteration = self.n_iter, log_likelihood = ll, delta, "EM iteration");

        if converged {
            self.state = EmState::Converged;
            if self.comm.is_root() {
                info!(iterations = self.n_iter, log_likelihood = ll, "EM converged");
            }
            false
        } else if self.n_iter >= self.options.max_iter {
            self.state = EmState::MaxIterReached;
            if self.comm.is_root() {
                info!(
                    iterations = self.n_iter,
                    log_likelihood = ll,
                    delta,
                    "EM stopped at iteration cap"
                );
            }
            false
        } else {
            true
        }
    }

    /// Hard assignment of every local point from the last responsibilities
    pub fn labels(&self) -> Vec<usize> {
        map_rows(self.options.parallelism, &self.responsibilities, argmax)
    }

    /// Iterate until converged or capped, then label the points.
    pub fn run(mut self, stats: &mut FitStats) -> GmmFit {
        if self.comm.is_root() {
            info!(
                points = self.total_points,
                k = self.params.k(),
                dim = self.params.dim(),
                ranks = self.comm.size(),
                parallel = self.options.parallelism.is_parallel(),
                "starting EM"
            );
        }
        while self.step(stats) {}

        let converged = self.state == EmState::Converged;
        let labels = self.labels();
        self.state = EmState::Labeled;

        GmmFit {
            params: self.params,
            labels,
            responsibilities: self.responsibilities,
            log_likelihood: self.ll,
            n_iter: self.n_iter,
            converged,
            state: EmState::Done,
            epsilon: self.options.responsibility_epsilon,
        }
    }
}

/// Result of an EM fit.
#[derive(Debug, Clone)]
pub struct GmmFit {
    /// Fitted components
    pub params: MixtureParams,
    /// Hard label per (local) point, in `0..k`
    pub labels: Vec<usize>,
    /// Final N×K responsibilities (local rows)
    pub responsibilities: Matrix,
    /// Log-likelihood of the final parameters over all points
    pub log_likelihood: f64,
    /// Iterations run
    pub n_iter: usize,
    /// Whether the tolerance was reached before `max_iter`
    pub converged: bool,
    /// Final lifecycle state
    pub state: EmState,
    /// Divisor guard the fit ran with, reused for new points
    epsilon: f64,
}

impl GmmFit {
    /// Number of components
    pub fn k(&self) -> usize {
        self.params.k()
    }

    /// Data dimension
    pub fn dim(&self) -> usize {
        self.params.dim()
    }

    /// Fitted components
    pub fn clusters(&self) -> &[Cluster] {
        self.params.clusters()
    }

    /// Mixing weights
    pub fn weights(&self) -> Vec<f64> {
        self.params.weights()
    }

    /// Component means
    pub fn means(&self) -> Vec<&[f64]> {
        self.params.means()
    }

    fn check_points(&self, points: &Matrix) -> Result<()> {
        if points.cols() != self.dim() {
            return Err(Error::shape_mismatch(
                &[points.rows(), self.dim()],
                &[points.rows(), points.cols()],
            ));
        }
        Ok(())
    }

    /// The responsibility epsilon the model was fitted with
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Posterior component probabilities for new points (N×K)
    pub fn predict_proba(&self, points: &Matrix) -> Result<Matrix> {
        self.check_points(points)?;
        let k = self.k();
        let mut out = Matrix::zeros(points.rows(), k);
        let mut scratch = vec![0.0; self.dim()];
        for i in 0..points.rows() {
            let row = out.row_mut(i);
            let total = self
                .params
                .weighted_densities(points.row(i), row, &mut scratch);
            normalize_row(row, total, self.epsilon);
        }
        Ok(out)
    }

    /// Most probable component for each new point
    pub fn predict(&self, points: &Matrix) -> Result<Vec<usize>> {
        let proba = self.predict_proba(points)?;
        Ok(proba.iter_rows().map(argmax).collect())
    }

    /// `ln(p(x) + eps)` under the fitted mixture for each new point, the
    /// same guarded form the fit's log-likelihood uses
    pub fn score_samples(&self, points: &Matrix) -> Result<Vec<f64>> {
        self.check_points(points)?;
        let mut scratch = vec![0.0; self.dim()];
        Ok(points
            .iter_rows()
            .map(|x| (self.params.mixture_density(x, &mut scratch) + self.epsilon).ln())
            .collect())
    }

    /// Mean log-likelihood per point
    pub fn score(&self, points: &Matrix) -> Result<f64> {
        let samples = self.score_samples(points)?;
        if samples.is_empty() {
            return Err(Error::invalid_argument("points", "score requires at least 1 point"));
        }
        Ok(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

/// Fit a K-component mixture to `data`.
///
/// ```
/// use gmmr::linalg::Matrix;
/// use gmmr::mixture::{EmOptions, fit};
///
/// let data = Matrix::from_rows(&[[0.0], [0.2], [10.0], [10.2]]).unwrap();
/// let result = fit(&data, 2, &EmOptions::default().with_seed(1)).unwrap();
/// assert_eq!(result.labels[0], result.labels[1]);
/// assert_ne!(result.labels[0], result.labels[2]);
/// ```
pub fn fit(data: &Matrix, k: usize, options: &EmOptions) -> Result<GmmFit> {
    let mut stats = FitStats::default();
    fit_with_stats(data, k, options, &mut stats)
}

/// [`fit`], recording timings and the log-likelihood history into `stats`
pub fn fit_with_stats(
    data: &Matrix,
    k: usize,
    options: &EmOptions,
    stats: &mut FitStats,
) -> Result<GmmFit> {
    validate_options(options, "fit")?;
    let params = initialize(data, k, options)?;
    let engine = EmEngine::new(data, params, options.clone())?;
    Ok(engine.run(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::initialize_with_means;
    use crate::parallel::Parallelism;

    fn line_data() -> Matrix {
        Matrix::from_rows(&[[0.0], [0.5], [1.0], [9.0], [9.5], [10.0]]).unwrap()
    }

    #[test]
    fn test_normalize_row_uniform_fallback() {
        let mut row = [0.0, 0.0, 0.0, 0.0];
        normalize_row(&mut row, 0.0, 1e-18);
        assert_eq!(row, [0.25; 4]);

        let mut row = [1.0, 3.0];
        normalize_row(&mut row, 4.0, 0.0);
        assert_eq!(row, [0.25, 0.75]);
    }

    #[test]
    fn test_argmax_ties_go_low() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), 1);
    }

    #[test]
    fn test_state_transitions() {
        let data = line_data();
        let params =
            initialize_with_means(&data, vec![vec![0.0], vec![10.0]], &EmOptions::default())
                .unwrap();
        let mut engine =
            EmEngine::new(&data, params, EmOptions::default().with_max_iter(2).sequential())
                .unwrap();
        assert_eq!(engine.state(), EmState::Initialized);

        let mut stats = FitStats::default();
        assert!(engine.step(&mut stats));
        assert_eq!(engine.state(), EmState::Iterating);
        assert!(!engine.step(&mut stats));
        assert!(engine.state().is_stopped());
        assert!(!engine.step(&mut stats));
        assert_eq!(engine.n_iter(), 2);

        let fit = engine.run(&mut stats);
        assert_eq!(fit.state, EmState::Done);
        assert_eq!(fit.n_iter, 2);
    }

    #[test]
    fn test_e_step_rows_sum_to_one() {
        let data = line_data();
        let params =
            initialize_with_means(&data, vec![vec![0.0], vec![10.0]], &EmOptions::default())
                .unwrap();
        let mut engine = EmEngine::new(&data, params, EmOptions::default()).unwrap();
        engine.e_step();
        for row in engine.responsibilities().iter_rows() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        let mass: f64 = engine.local_mass.iter().sum();
        assert!((mass - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_m_step_weights_sum_to_one() {
        let data = line_data();
        let params =
            initialize_with_means(&data, vec![vec![0.0], vec![10.0]], &EmOptions::default())
                .unwrap();
        let mut engine = EmEngine::new(&data, params, EmOptions::default()).unwrap();
        engine.e_step();
        assert_eq!(engine.m_step(), 0);
        assert!((engine.params().total_weight() - 1.0).abs() < 1e-12);
        // symmetric data and starting means stay symmetric about 5
        let means = engine.params().means();
        assert!(means[0][0] < 2.5 && means[1][0] > 7.5);
        assert!((means[0][0] + means[1][0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_covariance_uses_updated_mean() {
        let data = Matrix::from_rows(&[[0.0], [1.0], [2.0], [6.0]]).unwrap();
        let params =
            initialize_with_means(&data, vec![vec![0.0], vec![6.0]], &EmOptions::default())
                .unwrap();
        let mut engine = EmEngine::new(&data, params, EmOptions::default().sequential()).unwrap();
        engine.e_step();

        // pin the responsibilities so the expected values can be worked by hand
        let fixed = [[1.0, 0.0], [0.75, 0.25], [0.5, 0.5], [0.0, 1.0]];
        for (i, r) in fixed.iter().enumerate() {
            engine.responsibilities.row_mut(i).copy_from_slice(r);
        }
        engine.local_mass = vec![2.25, 1.75];
        assert_eq!(engine.m_step(), 0);

        let clusters = engine.params().clusters();
        // N_0 = 2.25, mu_0 = 1.75 / 2.25 = 7/9
        // sum r (x - 7/9)^2 = 1.388..., / 2.25 = 50/81; against the old mean 0 it is 11/9
        assert!((clusters[0].mean[0] - 7.0 / 9.0).abs() < 1e-12);
        assert!((clusters[0].covariance[(0, 0)] - (50.0 / 81.0 + 1e-6)).abs() < 1e-12);
        // N_1 = 1.75, mu_1 = 7.25 / 1.75 = 29/7; scatter 230/49, against the old mean 6 it is 57/7
        assert!((clusters[1].mean[0] - 29.0 / 7.0).abs() < 1e-12);
        assert!((clusters[1].covariance[(0, 0)] - (230.0 / 49.0 + 1e-6)).abs() < 1e-12);
        assert!((clusters[0].weight - 2.25 / 4.0).abs() < 1e-15);
        assert!((clusters[1].weight - 1.75 / 4.0).abs() < 1e-15);
    }

    #[test]
    fn test_cached_and_uncached_fits_agree() {
        let data = line_data();
        let opts = EmOptions::default().with_seed(5).sequential();
        let a = fit(&data, 2, &opts).unwrap();
        let b = fit(&data, 2, &opts.clone().with_cache_inverse(false)).unwrap();
        assert_eq!(a.labels, b.labels);
        assert!((a.log_likelihood - b.log_likelihood).abs() < 1e-9);
    }

    #[test]
    fn test_rayon_matches_sequential() {
        let data = line_data();
        let seq = fit(&data, 2, &EmOptions::default().with_seed(9).sequential()).unwrap();
        let par = fit(
            &data,
            2,
            &EmOptions::default()
                .with_seed(9)
                .with_parallelism(Parallelism::Rayon { min_len: 1 }),
        )
        .unwrap();
        assert_eq!(seq.labels, par.labels);
        assert!((seq.log_likelihood - par.log_likelihood).abs() < 1e-9);
    }

    #[test]
    fn test_predict_new_points() {
        let data = line_data();
        let fit = fit(&data, 2, &EmOptions::default().with_seed(2)).unwrap();
        let probe = Matrix::from_rows(&[[0.2], [9.8]]).unwrap();
        let labels = fit.predict(&probe).unwrap();
        assert_eq!(labels[0], fit.labels[0]);
        assert_eq!(labels[1], fit.labels[5]);

        let proba = fit.predict_proba(&probe).unwrap();
        for row in proba.iter_rows() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert!(fit.score(&probe).unwrap().is_finite());
        assert!(fit.predict(&Matrix::zeros(1, 2)).is_err());
    }

    #[test]
    fn test_score_far_point_is_finite() {
        let data = line_data();
        let fit = fit(&data, 2, &EmOptions::default().with_seed(2)).unwrap();
        let far = Matrix::from_rows(&[[1e6]]).unwrap();
        let scores = fit.score_samples(&far).unwrap();
        assert_eq!(scores[0], 1e-18f64.ln());
        assert!(fit.score(&far).unwrap().is_finite());
    }

    #[test]
    fn test_predict_proba_uses_fitted_epsilon() {
        let data = line_data();
        let eps = 1e-3;
        let fit = fit(
            &data,
            2,
            &EmOptions::default().with_seed(2).with_responsibility_epsilon(eps),
        )
        .unwrap();
        assert_eq!(fit.epsilon(), eps);

        let point = Matrix::from_rows(&[[0.5]]).unwrap();
        let proba = fit.predict_proba(&point).unwrap();
        let mut weighted = vec![0.0; 2];
        let total = fit
            .params
            .weighted_densities(point.row(0), &mut weighted, &mut [0.0]);
        for (p, w) in proba.row(0).iter().zip(&weighted) {
            assert!((p - w / (total + eps)).abs() < 1e-15);
        }
        assert!(proba.row(0).iter().sum::<f64>() < 1.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let data = line_data();
        assert!(fit(&data, 0, &EmOptions::default()).is_err());
        assert!(fit(&data, 7, &EmOptions::default()).is_err());
        assert!(fit(&data, 2, &EmOptions::default().with_max_iter(0)).is_err());
        assert!(fit(&Matrix::zeros(0, 1), 1, &EmOptions::default()).is_err());
    }
}
