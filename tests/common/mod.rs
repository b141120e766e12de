//! Common test utilities
#![allow(dead_code)]

use gmmr::linalg::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// `per_center` points around each center with uniform noise in [-spread, spread]
/// on every coordinate, grouped by center.
pub fn blobs(centers: &[&[f64]], per_center: usize, spread: f64, seed: u64) -> Matrix {
    let dim = centers[0].len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = Vec::with_capacity(centers.len() * per_center * dim);
    for center in centers {
        for _ in 0..per_center {
            for &c in center.iter() {
                values.push(c + rng.random_range(-spread..=spread));
            }
        }
    }
    Matrix::from_vec(centers.len() * per_center, dim, values).unwrap()
}

/// The three 2-D blobs at (0,0), (5,5) and (10,0), 50 points each
pub fn three_blobs(seed: u64) -> Matrix {
    blobs(&[&[0.0, 0.0], &[5.0, 5.0], &[10.0, 0.0]], 50, 1.0, seed)
}

/// Euclidean distance
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Random symmetric positive definite `n x n` matrix: `B B^T + n I`
pub fn random_spd(n: usize, rng: &mut StdRng) -> Matrix {
    let mut b = Matrix::zeros(n, n);
    for v in b.as_mut_slice() {
        *v = rng.random_range(-1.0..1.0);
    }
    let mut a = b.matmul(&b.transpose()).unwrap();
    a.add_to_diagonal(n as f64);
    a
}
