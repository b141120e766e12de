//! Data-parallel EM across ranks
//!
//! Each rank owns a contiguous shard of the points plus a full replica of the
//! cluster parameters. Per-cluster sums are combined with
//! [`Communicator::all_reduce_sum`], so every rank finalizes identical
//! parameters and runs the same number of iterations.

use std::ops::Range;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::linalg::Matrix;
use crate::mixture::{EmEngine, EmOptions, FitStats, GmmFit, MixtureParams};

/// Collective operations needed by the EM engine.
///
/// Every rank must call the collectives in the same order with buffers of
/// the same length.
pub trait Communicator: Sync {
    /// This rank's index in `0..size()`
    fn rank(&self) -> usize;

    /// Number of participating ranks
    fn size(&self) -> usize;

    /// Element-wise sum of `buf` across all ranks, written back into `buf` on every rank
    fn all_reduce_sum(&self, buf: &mut [f64]);

    /// Value of `flag` on `root`, returned on every rank
    fn broadcast_flag(&self, root: usize, flag: bool) -> bool;

    /// Sum of one scalar across ranks
    fn all_reduce_scalar(&self, value: f64) -> f64 {
        let mut buf = [value];
        self.all_reduce_sum(&mut buf);
        buf[0]
    }

    /// Whether this rank makes global decisions
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// The trivial one-rank communicator; every collective is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    #[inline]
    fn rank(&self) -> usize {
        0
    }

    #[inline]
    fn size(&self) -> usize {
        1
    }

    #[inline]
    fn all_reduce_sum(&self, _buf: &mut [f64]) {}

    #[inline]
    fn broadcast_flag(&self, _root: usize, flag: bool) -> bool {
        flag
    }
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    aborted: Option<usize>,
}

/// Reusable barrier that can be torn down by a failing rank.
///
/// `std::sync::Barrier` has no way to release waiters early, so a rank that
/// panicked would leave every other rank parked forever.
#[derive(Debug)]
struct AbortableBarrier {
    state: Mutex<BarrierState>,
    cvar: Condvar,
    size: usize,
}

impl AbortableBarrier {
    fn new(size: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState::default()),
            cvar: Condvar::new(),
            size,
        }
    }

    /// Block until all ranks arrive. Panics if the group was aborted.
    fn wait(&self) {
        let mut state = self.state.lock();
        if let Some(origin) = state.aborted {
            drop(state);
            panic!("rank group aborted by rank {origin}");
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.size {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return;
        }
        while state.generation == generation && state.aborted.is_none() {
            self.cvar.wait(&mut state);
        }
        if state.generation == generation {
            let origin = state.aborted.unwrap_or_default();
            drop(state);
            panic!("rank group aborted by rank {origin}");
        }
    }

    /// Release every waiter; the first caller is recorded as the origin.
    fn abort(&self, rank: usize) {
        let mut state = self.state.lock();
        state.aborted.get_or_insert(rank);
        self.cvar.notify_all();
    }

    fn aborted_by(&self) -> Option<usize> {
        self.state.lock().aborted
    }
}

#[derive(Debug)]
struct Shared {
    barrier: AbortableBarrier,
    slot: Mutex<Vec<f64>>,
    flag: Mutex<bool>,
}

/// A group of in-process ranks that exchange data through shared memory.
///
/// Ranks are expected to run on separate threads (see [`run_ranks`]); the
/// collectives block until every rank has arrived. If a rank panics and the
/// group is aborted, collectives on the remaining ranks panic instead of
/// blocking.
#[derive(Debug, Clone)]
pub struct LocalGroup {
    shared: Arc<Shared>,
    size: usize,
}

impl LocalGroup {
    /// Group of `size` ranks
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_argument("ranks", "rank count must be > 0"));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                barrier: AbortableBarrier::new(size),
                slot: Mutex::new(Vec::new()),
                flag: Mutex::new(false),
            }),
            size,
        })
    }

    /// Number of ranks
    pub fn size(&self) -> usize {
        self.size
    }

    /// Communicator for one rank
    pub fn communicator(&self, rank: usize) -> Result<LocalCommunicator> {
        if rank >= self.size {
            return Err(Error::invalid_argument(
                "rank",
                format!("rank {rank} out of range for group of {}", self.size),
            ));
        }
        Ok(LocalCommunicator {
            shared: Arc::clone(&self.shared),
            rank,
            size: self.size,
        })
    }

    /// One communicator per rank, in rank order
    pub fn communicators(&self) -> Vec<LocalCommunicator> {
        (0..self.size)
            .map(|rank| LocalCommunicator {
                shared: Arc::clone(&self.shared),
                rank,
                size: self.size,
            })
            .collect()
    }

    /// Wake every rank blocked in a collective and make further collectives
    /// panic. `rank` is recorded as the cause unless another rank got there first.
    pub fn abort(&self, rank: usize) {
        self.shared.barrier.abort(rank);
    }

    /// Rank that aborted the group, if any
    pub fn aborted_by(&self) -> Option<usize> {
        self.shared.barrier.aborted_by()
    }
}

/// One rank's handle into a [`LocalGroup`]
#[derive(Debug, Clone)]
pub struct LocalCommunicator {
    shared: Arc<Shared>,
    rank: usize,
    size: usize,
}

impl LocalCommunicator {
    /// Abort the whole group on behalf of this rank
    pub fn abort(&self) {
        self.shared.barrier.abort(self.rank);
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce_sum(&self, buf: &mut [f64]) {
        if self.size == 1 {
            return;
        }
        let shared = &*self.shared;

        if self.rank == 0 {
            let mut slot = shared.slot.lock();
            slot.clear();
            slot.resize(buf.len(), 0.0);
        }
        shared.barrier.wait();

        {
            let mut slot = shared.slot.lock();
            assert_eq!(slot.len(), buf.len(), "all_reduce_sum length differs across ranks");
            for (acc, &v) in slot.iter_mut().zip(buf.iter()) {
                *acc += v;
            }
        }
        shared.barrier.wait();

        {
            let slot = shared.slot.lock();
            for (out, &v) in buf.iter_mut().zip(slot.iter()) {
                *out = v;
            }
        }
        // nobody may reset the slot until every rank has read it
        shared.barrier.wait();
    }

    fn broadcast_flag(&self, root: usize, flag: bool) -> bool {
        if self.size == 1 {
            return flag;
        }
        let shared = &*self.shared;
        if self.rank == root {
            *shared.flag.lock() = flag;
        }
        shared.barrier.wait();
        let value = *shared.flag.lock();
        shared.barrier.wait();
        value
    }
}

/// Aborts the group if its rank unwinds.
struct AbortOnPanic<'a>(&'a LocalCommunicator);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.abort();
        }
    }
}

/// Run `f` once per rank of a fresh [`LocalGroup`], each on its own thread.
///
/// Results are returned in rank order. `f` must reach the same collectives on
/// every rank. A rank that panics or returns an error aborts the group so
/// nobody stays blocked; the call then fails with that rank's error, or with
/// [`Error::Internal`] naming the rank that panicked first.
pub fn run_ranks<T, F>(size: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&LocalCommunicator) -> Result<T> + Sync,
{
    let group = LocalGroup::new(size)?;
    let comms = group.communicators();
    let f = &f;

    let joined = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(comms.len());
        for comm in &comms {
            let spawned = std::thread::Builder::new()
                .name(format!("gmmr-rank-{}", comm.rank()))
                .spawn_scoped(scope, move || {
                    let _guard = AbortOnPanic(comm);
                    let result = f(comm);
                    if result.is_err() {
                        comm.abort();
                    }
                    result
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // ranks already running would wait for this one forever
                    group.abort(comm.rank());
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(Error::from(e));
                }
            }
        }
        Ok(handles.into_iter().map(|h| h.join()).collect::<Vec<_>>())
    })?;

    let mut results = Vec::with_capacity(joined.len());
    let mut first_error = None;
    for (rank, outcome) in joined.into_iter().enumerate() {
        match outcome {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(e)) => {
                if group.aborted_by() == Some(rank) || first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(_) => {
                if group.aborted_by() == Some(rank) {
                    first_error = Some(Error::Internal(format!("rank {rank} panicked")));
                }
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    match group.aborted_by() {
        Some(origin) => Err(Error::Internal(format!("rank {origin} panicked"))),
        None => Ok(results),
    }
}

/// Contiguous row range owned by `rank` when `n` rows are split over `size`
/// ranks. The first `n % size` ranks get one extra row.
pub fn shard_range(n: usize, size: usize, rank: usize) -> Range<usize> {
    if size == 0 || rank >= size {
        return n..n;
    }
    let base = n / size;
    let extra = n % size;
    let start = rank * base + rank.min(extra);
    let len = base + usize::from(rank < extra);
    start..start + len
}

/// Copy of the rows of `data` owned by `rank`
pub fn shard_rows(data: &Matrix, size: usize, rank: usize) -> Matrix {
    let range = shard_range(data.rows(), size, rank);
    let cols = data.cols();
    let slice = &data.as_slice()[range.start * cols..range.end * cols];
    let mut shard = Matrix::zeros(range.len(), cols);
    shard.as_mut_slice().copy_from_slice(slice);
    shard
}

/// Fit on this rank's shard, combining statistics with the other ranks.
///
/// `initial` must be identical on every rank. `k` is checked against it.
/// The returned labels and responsibilities cover the local shard only;
/// cluster parameters and the log-likelihood are global.
pub fn fit_distributed<C: Communicator>(
    comm: &C,
    shard: &Matrix,
    k: usize,
    initial: MixtureParams,
    options: &EmOptions,
) -> Result<GmmFit> {
    let mut stats = FitStats::default();
    fit_distributed_with_stats(comm, shard, k, initial, options, &mut stats)
}

/// [`fit_distributed`] with per-phase timings collected into `stats`
pub fn fit_distributed_with_stats<C: Communicator>(
    comm: &C,
    shard: &Matrix,
    k: usize,
    initial: MixtureParams,
    options: &EmOptions,
    stats: &mut FitStats,
) -> Result<GmmFit> {
    if initial.k() != k {
        return Err(Error::invalid_argument(
            "k",
            format!("initial parameters have {} clusters, expected {k}", initial.k()),
        ));
    }
    let engine = EmEngine::with_communicator(shard, initial, options.clone(), comm)?;
    Ok(engine.run(stats))
}
