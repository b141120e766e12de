//! Per-run timing and event counters

use std::fmt;
use std::time::{Duration, Instant};

/// Statistics collected while fitting.
///
/// Owned by the caller and passed into the engine by `&mut`; nothing here is
/// process-global, so concurrent fits never share counters.
#[derive(Debug, Clone, Default)]
pub struct FitStats {
    /// Completed EM iterations
    pub iterations: usize,
    /// Log-likelihood after each iteration
    pub log_likelihoods: Vec<f64>,
    /// Time spent in the E-step
    pub e_step_time: Duration,
    /// Time spent in the M-step (including covariance factorization)
    pub m_step_time: Duration,
    /// Time spent evaluating the log-likelihood
    pub likelihood_time: Duration,
    /// Covariances found singular across all M-steps
    pub singular_events: usize,
}

impl FitStats {
    /// Total time across all phases
    pub fn total_time(&self) -> Duration {
        self.e_step_time + self.m_step_time + self.likelihood_time
    }

    /// Last recorded log-likelihood
    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.log_likelihoods.last().copied()
    }

    /// Whether the recorded log-likelihood never drops by more than `slack`
    pub fn is_monotone(&self, slack: f64) -> bool {
        self.log_likelihoods.windows(2).all(|w| w[1] >= w[0] - slack)
    }

    /// Multi-line human readable report
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "iterations:        {}", self.iterations)?;
        if let Some(ll) = self.final_log_likelihood() {
            writeln!(f, "log-likelihood:    {ll:.6}")?;
        }
        writeln!(f, "e-step:            {:.6}s", self.e_step_time.as_secs_f64())?;
        writeln!(f, "m-step:            {:.6}s", self.m_step_time.as_secs_f64())?;
        writeln!(f, "likelihood:        {:.6}s", self.likelihood_time.as_secs_f64())?;
        write!(f, "singular matrices: {}", self.singular_events)
    }
}

/// Run `f` and add its wall time to `slot`
#[inline]
pub(crate) fn timed<R>(slot: &mut Duration, f: impl FnOnce() -> R) -> R {
    let start = Instant::now();
    let out = f();
    *slot += start.elapsed();
    out
}
