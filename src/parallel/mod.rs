//! Work distribution for the EM kernels
//!
//! Two regimes are supported and can be combined:
//!
//! - **Shared memory**: point loops run on rayon workers over disjoint row
//!   ranges. Per-cluster sums are reduced with the partial-then-combine
//!   helpers in [`reduce`], so no worker ever writes a shared accumulator.
//! - **Data parallel**: each rank owns a contiguous shard of the points and
//!   cluster statistics are combined with an all-reduce through a
//!   [`Communicator`](distributed::Communicator).
//!
//! Every parallel region is a join point: a phase finishes on all workers
//! before the next one starts.

pub mod distributed;
pub mod reduce;

use crate::error::{Error, Result};

/// Default minimum number of points handed to one rayon task
pub const DEFAULT_MIN_LEN: usize = 64;

/// How point loops are executed inside one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    /// Single-threaded loops
    Sequential,
    /// Rayon work-stealing over point ranges of at least `min_len` points.
    ///
    /// Falls back to sequential execution when the `rayon` feature is off.
    Rayon {
        /// Minimum points per task
        min_len: usize,
    },
}

impl Default for Parallelism {
    fn default() -> Self {
        if cfg!(feature = "rayon") {
            Parallelism::Rayon {
                min_len: DEFAULT_MIN_LEN,
            }
        } else {
            Parallelism::Sequential
        }
    }
}

impl Parallelism {
    /// Whether loops will actually fan out to worker threads
    pub fn is_parallel(&self) -> bool {
        cfg!(feature = "rayon") && matches!(self, Parallelism::Rayon { .. })
    }
}

/// Number of worker threads available to the current rayon scope (1 without rayon)
pub fn current_num_threads() -> usize {
    #[cfg(feature = "rayon")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "rayon"))]
    {
        1
    }
}

/// Run `f` on a dedicated pool of `threads` workers.
///
/// `None` runs `f` on the global pool.
pub fn with_thread_pool<R, F>(threads: Option<usize>, f: F) -> Result<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match threads {
        None => Ok(f()),
        Some(0) => Err(Error::invalid_argument("threads", "thread count must be > 0")),
        #[cfg(feature = "rayon")]
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .thread_name(|i| format!("gmmr-worker-{i}"))
                .build()
                .map_err(|e| Error::Internal(format!("failed to build thread pool: {e}")))?;
            Ok(pool.install(f))
        }
        #[cfg(not(feature = "rayon"))]
        Some(_) => Ok(f()),
    }
}
