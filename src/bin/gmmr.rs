//! gmmr command line
//!
//! Fits a Gaussian mixture to a CSV dataset and writes every point back with
//! its cluster label.
//!
//! ```text
//! gmmr -k 3 --input data.csv --output labelled.csv --threads 4
//! gmmr -k 3 --input data.csv --ranks 2 -vv
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use gmmr::io::{format_report, load_csv, timing_line, write_results_csv};
use gmmr::linalg::{LinalgMethod, Matrix};
use gmmr::mixture::{
    DEFAULT_MAX_ITER, DEFAULT_REG_COVAR, DEFAULT_TOL, EmOptions, FitStats, GmmFit, fit_with_stats,
    initialize,
};
use gmmr::parallel::distributed::{
    Communicator, fit_distributed_with_stats, run_ranks, shard_rows,
};
use gmmr::parallel::{Parallelism, current_num_threads, with_thread_pool};

/// Fit a Gaussian mixture model with Expectation-Maximization
#[derive(Parser, Debug)]
#[command(name = "gmmr")]
#[command(version)]
#[command(about = "Fit a Gaussian mixture model to a CSV dataset with EM")]
struct Cli {
    /// Number of mixture components
    #[arg(short = 'k', long = "clusters", default_value_t = 3)]
    clusters: usize,

    /// Input CSV (header row; a `label` column and anything after it is ignored)
    #[arg(long, default_value = "./datasets/gmm_P10000_K3_D2.csv")]
    input: PathBuf,

    /// Output CSV with one 1-based label per point
    #[arg(long, default_value = "./results/em_P10000_K3_D2.csv")]
    output: PathBuf,

    /// Maximum EM iterations
    #[arg(long, default_value_t = DEFAULT_MAX_ITER)]
    max_iter: usize,

    /// Stop when the log-likelihood changes by less than this
    #[arg(long, default_value_t = DEFAULT_TOL)]
    tol: f64,

    /// Added to every covariance diagonal after each M-step
    #[arg(long, default_value_t = DEFAULT_REG_COVAR)]
    reg_covar: f64,

    /// Seed for the initializer (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Covariance inversion: auto, lu or adjugate
    #[arg(long, default_value = "auto")]
    inversion: LinalgMethod,

    /// Worker threads; 0 runs sequentially, omitted uses every core
    #[arg(long)]
    threads: Option<usize>,

    /// Split the points over this many in-process ranks
    #[arg(long, default_value_t = 1)]
    ranks: usize,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> EmOptions {
        let mut options = EmOptions::default()
            .with_max_iter(self.max_iter)
            .with_tol(self.tol)
            .with_reg_covar(self.reg_covar)
            .with_method(self.inversion);
        if let Some(seed) = self.seed {
            options = options.with_seed(seed);
        }
        if self.threads == Some(0) {
            options = options.with_parallelism(Parallelism::Sequential);
        }
        options
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if cli.ranks == 0 {
        bail!("--ranks must be at least 1");
    }

    let data = load_csv(&cli.input)
        .with_context(|| format!("failed to load dataset {}", cli.input.display()))?;
    let options = cli.options();
    let pool_threads = cli.threads.filter(|&t| t > 0);

    let (result, stats, threads, elapsed) = with_thread_pool(pool_threads, || {
        let threads = if cli.threads == Some(0) {
            1
        } else {
            current_num_threads()
        };
        let start = Instant::now();
        let mut stats = FitStats::default();
        let result = if cli.ranks > 1 {
            fit_ranks(&data, cli.clusters, cli.ranks, &options, &mut stats)
        } else {
            fit_with_stats(&data, cli.clusters, &options, &mut stats)
                .map(|fit| {
                    let labels = fit.labels.clone();
                    (fit, labels)
                })
                .map_err(Into::into)
        };
        (result, stats, threads, start.elapsed())
    })?;
    let (result, labels) = result.context("EM failed")?;

    println!(
        "{}",
        timing_line(data.rows(), cli.clusters, data.cols(), threads * cli.ranks, elapsed)
    );
    print!("{}", format_report(&result));
    tracing::info!("\n{}", stats.summary());

    write_results_csv(&cli.output, &data, &labels)
        .with_context(|| format!("failed to write results to {}", cli.output.display()))?;
    Ok(())
}

/// Fit across `ranks` in-process ranks; returns rank 0's result and the
/// labels of every shard stitched back in row order.
fn fit_ranks(
    data: &Matrix,
    k: usize,
    ranks: usize,
    options: &EmOptions,
    stats: &mut FitStats,
) -> Result<(GmmFit, Vec<usize>)> {
    let initial = initialize(data, k, options)?;
    let fits = run_ranks(ranks, |comm| {
        let shard = shard_rows(data, comm.size(), comm.rank());
        let mut local_stats = FitStats::default();
        let fit = fit_distributed_with_stats(
            comm,
            &shard,
            k,
            initial.clone(),
            options,
            &mut local_stats,
        )?;
        Ok((fit, local_stats))
    })?;

    let mut labels = Vec::with_capacity(data.rows());
    let mut root = None;
    for (rank, (fit, local_stats)) in fits.into_iter().enumerate() {
        labels.extend_from_slice(&fit.labels);
        if rank == 0 {
            *stats = local_stats;
            root = Some(fit);
        }
    }
    match root {
        Some(fit) => Ok((fit, labels)),
        None => bail!("no ranks produced a result"),
    }
}
