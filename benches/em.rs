//! EM and inversion benchmarks
//!
//! Run with:
//! - `cargo bench --bench em`
//! - `cargo bench --bench em inversion -- --noplot`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gmmr::linalg::{LinalgMethod, Matrix, inverse_and_determinant};
use gmmr::mixture::{EmEngine, EmOptions, FitStats, initialize};
use gmmr::parallel::Parallelism;

// =============================================================================
// Deterministic data
// =============================================================================

/// `n` points spread over `k` centers on a circle of radius 10
fn generate_points(n: usize, k: usize, dim: usize) -> Matrix {
    let mut data = Matrix::zeros(n, dim);
    for i in 0..n {
        let center = (i % k) as f64 * std::f64::consts::TAU / k as f64;
        let row = data.row_mut(i);
        for (d, v) in row.iter_mut().enumerate() {
            let base = if d % 2 == 0 { center.cos() } else { center.sin() } * 10.0;
            *v = base + ((i * 31 + d * 17) % 97) as f64 / 97.0 - 0.5;
        }
    }
    data
}

/// Diagonally dominant symmetric matrix
fn generate_spd(n: usize) -> Matrix {
    let mut a = Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let v = if i == j { n as f64 } else { 1.0 / (1.0 + (i + j) as f64) };
            a.set(i, j, v);
        }
    }
    a
}

// =============================================================================
// Inversion
// =============================================================================

fn bench_inversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("inversion");
    for n in [2usize, 4, 6, 8] {
        let a = generate_spd(n);
        for method in [LinalgMethod::Cofactor, LinalgMethod::Lu] {
            group.bench_with_input(
                BenchmarkId::new(format!("{method:?}"), n),
                &a,
                |b, a| b.iter(|| inverse_and_determinant(black_box(a), method)),
            );
        }
    }
    group.finish();
}

// =============================================================================
// Fixed-iteration EM
// =============================================================================

fn bench_em_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("em_10_iterations");
    group.sample_size(20);

    for n in [1_000usize, 10_000] {
        let data = generate_points(n, 3, 2);
        group.throughput(Throughput::Elements(n as u64));

        let modes = [
            ("sequential", Parallelism::Sequential),
            ("rayon", Parallelism::default()),
        ];
        for (name, parallelism) in modes {
            let options = EmOptions::default()
                .with_seed(1)
                .with_tol(0.0)
                .with_max_iter(10)
                .with_parallelism(parallelism);
            let initial = initialize(&data, 3, &options).unwrap();
            group.bench_with_input(BenchmarkId::new(name, n), &data, |b, data| {
                b.iter(|| {
                    let engine = EmEngine::new(data, initial.clone(), options.clone()).unwrap();
                    black_box(engine.run(&mut FitStats::default()))
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_inversion, bench_em_iterations);
criterion_main!(benches);
