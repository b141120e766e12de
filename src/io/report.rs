//! Plain-text summaries of a fit

use std::fmt::Write as _;
use std::time::Duration;

use crate::mixture::GmmFit;

/// One-line timing record: `N, K, D, threads, seconds`
pub fn timing_line(n: usize, k: usize, dim: usize, threads: usize, elapsed: Duration) -> String {
    format!("{n}, {k}, {dim}, {threads}, {:.6}", elapsed.as_secs_f64())
}

/// Per-cluster weight, mean and covariance
pub fn format_report(fit: &GmmFit) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} after {} iteration(s), log-likelihood {:.6}",
        if fit.converged { "converged" } else { "not converged" },
        fit.n_iter,
        fit.log_likelihood
    );
    for (j, c) in fit.clusters().iter().enumerate() {
        let _ = writeln!(out, "cluster {} (weight {:.6})", j + 1, c.weight);
        let _ = writeln!(out, "  mean: {}", join(&c.mean));
        let _ = writeln!(out, "  covariance:");
        for row in c.covariance.iter_rows() {
            let _ = writeln!(out, "    {}", join(row));
        }
    }
    out
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.6}"))
        .collect::<Vec<_>>()
        .join(" ")
}
