//! Partial-then-combine reductions
//!
//! Each worker folds its share of the points into a private accumulator;
//! the partials are merged pairwise once the region completes. The shared
//! result is never mutated from more than one worker.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::Parallelism;
use crate::linalg::Matrix;

/// A per-worker partial result that can be combined with another partial.
pub trait Accumulator: Send + Sized {
    /// Combine two partials into one
    fn merge(self, other: Self) -> Self;
}

impl Accumulator for f64 {
    #[inline]
    fn merge(self, other: Self) -> Self {
        self + other
    }
}

/// Fixed-length vector of running sums (per-cluster mass, weighted mean
/// sums, weighted covariance sums).
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSums {
    values: Vec<f64>,
}

impl PartialSums {
    /// `len` zeros
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no slots
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add `value` to slot `idx`
    #[inline]
    pub fn add(&mut self, idx: usize, value: f64) {
        self.values[idx] += value;
    }

    /// Read-only view
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Mutable view (used to hand the buffer to an all-reduce)
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Take the buffer
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

impl Accumulator for PartialSums {
    fn merge(mut self, other: Self) -> Self {
        debug_assert_eq!(self.values.len(), other.values.len());
        for (a, b) in self.values.iter_mut().zip(other.values) {
            *a += b;
        }
        self
    }
}

/// Fold point indices `0..n` into an accumulator.
///
/// `identity` creates an empty partial for each worker; `fold` adds one
/// point to a partial.
pub fn fold_points<A, I, F>(parallelism: Parallelism, n: usize, identity: I, fold: F) -> A
where
    A: Accumulator,
    I: Fn() -> A + Sync + Send,
    F: Fn(&mut A, usize) + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if let Parallelism::Rayon { min_len } = parallelism {
            return (0..n)
                .into_par_iter()
                .with_min_len(min_len.max(1))
                .fold(&identity, |mut acc, i| {
                    fold(&mut acc, i);
                    acc
                })
                .reduce(&identity, A::merge);
        }
    }

    #[cfg(not(feature = "rayon"))]
    let _ = parallelism;

    let mut acc = identity();
    for i in 0..n {
        fold(&mut acc, i);
    }
    acc
}

/// Fold over the rows of a row-major buffer while writing each row in place.
///
/// Rows are disjoint `row_len` chunks of `data`, so workers never touch the
/// same row.
pub fn fold_rows_mut<A, I, F>(
    parallelism: Parallelism,
    data: &mut [f64],
    row_len: usize,
    identity: I,
    fold: F,
) -> A
where
    A: Accumulator,
    I: Fn() -> A + Sync + Send,
    F: Fn(&mut A, usize, &mut [f64]) + Sync + Send,
{
    if row_len == 0 {
        return identity();
    }

    #[cfg(feature = "rayon")]
    {
        if let Parallelism::Rayon { min_len } = parallelism {
            return data
                .par_chunks_mut(row_len)
                .enumerate()
                .with_min_len(min_len.max(1))
                .fold(&identity, |mut acc, (i, row)| {
                    fold(&mut acc, i, row);
                    acc
                })
                .reduce(&identity, A::merge);
        }
    }

    #[cfg(not(feature = "rayon"))]
    let _ = parallelism;

    let mut acc = identity();
    for (i, row) in data.chunks_mut(row_len).enumerate() {
        fold(&mut acc, i, row);
    }
    acc
}

/// Map every row of `m` to a value, preserving order
pub fn map_rows<T, F>(parallelism: Parallelism, m: &Matrix, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&[f64]) -> T + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if let Parallelism::Rayon { min_len } = parallelism {
            return (0..m.rows())
                .into_par_iter()
                .with_min_len(min_len.max(1))
                .map(|i| f(m.row(i)))
                .collect();
        }
    }

    #[cfg(not(feature = "rayon"))]
    let _ = parallelism;

    m.iter_rows().map(f).collect()
}

/// Apply `f` to every item (one cluster per task)
pub fn for_each_mut<T, F>(parallelism: Parallelism, items: &mut [T], f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        if parallelism.is_parallel() {
            items
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, item)| f(i, item));
            return;
        }
    }

    #[cfg(not(feature = "rayon"))]
    let _ = parallelism;

    for (i, item) in items.iter_mut().enumerate() {
        f(i, item);
    }
}
