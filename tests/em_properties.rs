//! Invariants of the EM iteration on synthetic data

mod common;

use gmmr::linalg::{LinalgMethod, Matrix};
use gmmr::mixture::{
    Cluster, EmEngine, EmOptions, EmState, FitStats, MixtureParams, fit, fit_with_stats,
    initialize,
};

use common::{assert_allclose_f64, blobs, distance, three_blobs};

#[test]
fn test_rows_and_weights_normalized_every_iteration() {
    let data = three_blobs(1);
    let options = EmOptions::default().with_seed(1).with_max_iter(30);
    let params = initialize(&data, 3, &options).unwrap();
    let mut engine = EmEngine::new(&data, params, options).unwrap();
    let mut stats = FitStats::default();

    loop {
        let more = engine.step(&mut stats);
        for (i, row) in engine.responsibilities().iter_rows().enumerate() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "iteration {} row {i}: {sum}", engine.n_iter());
        }
        let total = engine.params().total_weight();
        assert!((total - 1.0).abs() < 1e-9, "iteration {}: {total}", engine.n_iter());
        if !more {
            break;
        }
    }
    assert!(engine.state().is_stopped());
}

#[test]
fn test_log_likelihood_non_decreasing() {
    let data = three_blobs(2);
    let mut stats = FitStats::default();
    let result = fit_with_stats(&data, 3, &EmOptions::default().with_seed(2), &mut stats).unwrap();
    assert_eq!(stats.iterations, result.n_iter);
    assert_eq!(stats.log_likelihoods.len(), result.n_iter);
    let slack = 1e-6 * result.log_likelihood.abs().max(1.0);
    assert!(stats.is_monotone(slack), "{:?}", stats.log_likelihoods);
    assert_eq!(stats.final_log_likelihood(), Some(result.log_likelihood));
}

#[test]
fn test_three_blobs_recovered() {
    let truth: [&[f64]; 3] = [&[0.0, 0.0], &[5.0, 5.0], &[10.0, 0.0]];
    for seed in [3, 4, 5] {
        let data = three_blobs(seed);
        let result = fit(&data, 3, &EmOptions::default().with_seed(seed)).unwrap();
        assert!(result.converged, "seed {seed} did not converge");
        assert_eq!(result.state, EmState::Done);

        let means = result.means();
        for center in truth {
            let nearest = means
                .iter()
                .map(|m| distance(m, center))
                .fold(f64::INFINITY, f64::min);
            assert!(nearest < 1.0, "seed {seed}: no mean near {center:?}: {means:?}");
        }
        for a in 0..3 {
            for b in (a + 1)..3 {
                assert!(distance(means[a], means[b]) > 2.0, "seed {seed}: means too close");
            }
        }

        // every blob shares one label
        for blob in 0..3 {
            let first = result.labels[blob * 50];
            assert!(
                result.labels[blob * 50..(blob + 1) * 50].iter().all(|&l| l == first),
                "seed {seed}: blob {blob} split"
            );
        }
        assert_allclose_f64(&[result.weights().iter().sum()], &[1.0], 0.0, 1e-9, "weights");
    }
}

#[test]
fn test_single_point_single_cluster() {
    let data = Matrix::from_rows(&[[3.0, -2.0]]).unwrap();
    for method in [LinalgMethod::Cofactor, LinalgMethod::Lu] {
        let result = fit(&data, 1, &EmOptions::default().with_seed(0).with_method(method)).unwrap();
        let c = &result.clusters()[0];
        assert_allclose_f64(&c.mean, &[3.0, -2.0], 0.0, 1e-12, "mean");
        assert_allclose_f64(&[c.weight], &[1.0], 0.0, 1e-12, "weight");
        assert_allclose_f64(
            c.covariance.as_slice(),
            &[1e-6, 0.0, 0.0, 1e-6],
            0.0,
            1e-15,
            "covariance",
        );
        assert_eq!(result.labels, vec![0]);
    }
}

#[test]
fn test_two_separated_points() {
    let data = Matrix::from_rows(&[[0.0], [10.0]]).unwrap();
    let result = fit(&data, 2, &EmOptions::default().with_seed(8)).unwrap();
    assert_ne!(result.labels[0], result.labels[1]);
    for (i, &label) in result.labels.iter().enumerate() {
        let r = result.responsibilities.get(i, label);
        assert!(r > 0.99, "point {i}: responsibility {r}");
    }
}

#[test]
fn test_iteration_cap_reported() {
    let data = three_blobs(6);
    let result = fit(
        &data,
        3,
        &EmOptions::default().with_seed(6).with_max_iter(2).with_tol(0.0),
    )
    .unwrap();
    assert_eq!(result.n_iter, 2);
    assert!(!result.converged);
}

#[test]
fn test_duplicate_points_do_not_produce_nan() {
    // every point identical: the global covariance is zero to begin with
    let data = Matrix::from_rows(&[[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]).unwrap();
    let result = fit(&data, 2, &EmOptions::default().with_seed(0)).unwrap();
    assert!(result.log_likelihood.is_finite());
    for c in result.clusters() {
        assert!(c.mean.iter().all(|v| v.is_finite()));
        assert!(c.covariance.as_slice().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_tight_clusters_in_high_dimension_stay_apart() {
    // once fitted, each covariance is about 1e-6 I in 60 dimensions, so
    // det(S) is far below f64::MIN_POSITIVE while ln det(S) is ordinary
    let dim = 60;
    let low = vec![0.0; dim];
    let high = vec![1.0; dim];
    let data = blobs(&[low.as_slice(), high.as_slice()], 20, 5e-4, 17);

    let start = |center: f64| {
        Cluster::new(vec![center; dim], Matrix::from_diagonal(&vec![0.05; dim]), 0.5)
    };
    let params = MixtureParams::new(vec![start(0.2), start(0.8)], LinalgMethod::Lu).unwrap();
    let options = EmOptions::default()
        .with_method(LinalgMethod::Lu)
        .with_max_iter(20)
        .sequential();
    let mut stats = FitStats::default();
    let result = EmEngine::new(&data, params, options).unwrap().run(&mut stats);

    assert_eq!(stats.singular_events, 0);
    assert!(result.log_likelihood.is_finite());
    assert!(result.labels[..20].iter().all(|&l| l == 0), "{:?}", result.labels);
    assert!(result.labels[20..].iter().all(|&l| l == 1), "{:?}", result.labels);
    assert_allclose_f64(&result.weights(), &[0.5, 0.5], 0.0, 1e-9, "weights");
    assert_allclose_f64(result.means()[0], &low, 0.0, 1e-3, "low mean");
    assert_allclose_f64(result.means()[1], &high, 0.0, 1e-3, "high mean");
    for c in result.clusters() {
        assert!(!c.is_degenerate(LinalgMethod::Lu));
    }
}
