//! Farthest-point initialization

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::validation::{validate_data, validate_n_components};
use super::{Cluster, EmOptions, MixtureParams};
use crate::error::{Error, Result};
use crate::linalg::Matrix;

/// Pick K starting means and a shared starting covariance.
///
/// The first mean is a uniformly random data point. Each further mean is the
/// point whose squared distance to its nearest chosen mean is largest (ties
/// go to the lowest index). Every covariance starts as the empirical
/// covariance of the whole dataset and every weight as 1/K.
pub fn initialize(data: &Matrix, k: usize, options: &EmOptions) -> Result<MixtureParams> {
    validate_data(data, false, "initialize")?;
    validate_n_components(k, data.rows(), "initialize")?;

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let first = rng.random_range(0..data.rows());
    let chosen = farthest_points(data, first, k);
    tracing::debug!(?chosen, "initial means");

    let means = chosen.iter().map(|&i| data.row(i).to_vec()).collect();
    initialize_with_means(data, means, options)
}

/// Indices of `k` points chosen by greedy max-min distance, starting at `first`.
pub fn farthest_points(data: &Matrix, first: usize, k: usize) -> Vec<usize> {
    let mut chosen = Vec::with_capacity(k);
    if k == 0 || data.rows() == 0 {
        return chosen;
    }
    chosen.push(first);

    let mut nearest: Vec<f64> = data
        .iter_rows()
        .map(|x| squared_distance(x, data.row(first)))
        .collect();

    while chosen.len() < k {
        let mut best = 0;
        let mut best_dist = -1.0;
        for (i, &d) in nearest.iter().enumerate() {
            if d > best_dist {
                best_dist = d;
                best = i;
            }
        }
        chosen.push(best);

        let center = data.row(best);
        for (slot, x) in nearest.iter_mut().zip(data.iter_rows()) {
            let d = squared_distance(x, center);
            if d < *slot {
                *slot = d;
            }
        }
    }
    chosen
}

/// Parameters with the given means, the global covariance and equal weights.
///
/// Deterministic, so ranks of a distributed run can build identical starting
/// points from the same means.
pub fn initialize_with_means(
    data: &Matrix,
    means: Vec<Vec<f64>>,
    options: &EmOptions,
) -> Result<MixtureParams> {
    validate_data(data, false, "initialize_with_means")?;
    if means.is_empty() {
        return Err(Error::invalid_argument("means", "at least one mean required"));
    }
    let d = data.cols();
    if let Some(bad) = means.iter().find(|m| m.len() != d) {
        return Err(Error::shape_mismatch(&[d], &[bad.len()]));
    }

    let covariance = empirical_covariance(data);
    let weight = 1.0 / means.len() as f64;
    let clusters = means
        .into_iter()
        .map(|mean| Cluster::new(mean, covariance.clone(), weight))
        .collect();
    MixtureParams::new(clusters, options.method)
}

/// Column means of `data`
pub fn column_means(data: &Matrix) -> Vec<f64> {
    let mut mean = vec![0.0; data.cols()];
    if data.rows() == 0 {
        return mean;
    }
    for row in data.iter_rows() {
        for (m, &v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    let n = data.rows() as f64;
    for m in &mut mean {
        *m /= n;
    }
    mean
}

/// Population covariance (divides by N, not N - 1)
pub fn empirical_covariance(data: &Matrix) -> Matrix {
    let d = data.cols();
    let mut cov = Matrix::zeros(d, d);
    if data.rows() == 0 {
        return cov;
    }
    let mean = column_means(data);
    let mut diff = vec![0.0; d];
    for row in data.iter_rows() {
        for ((o, &v), &m) in diff.iter_mut().zip(row).zip(&mean) {
            *o = v - m;
        }
        for i in 0..d {
            for j in i..d {
                cov[(i, j)] += diff[i] * diff[j];
            }
        }
    }
    let n = data.rows() as f64;
    for i in 0..d {
        for j in i..d {
            let v = cov[(i, j)] / n;
            cov[(i, j)] = v;
            cov[(j, i)] = v;
        }
    }
    cov
}

#[inline]
fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
