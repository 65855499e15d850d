use std::any::Any;
use std::sync::{Barrier, Mutex, MutexGuard};

use thiserror::Error;

/// Rank of the worker that loads the input, composites and writes the result.
pub const COORDINATOR_RANK: usize = 0;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The root of a collective operation is not a member of the group.
    #[error("root rank {0} is not in a group of {1} workers")]
    InvalidRoot(usize, usize),

    /// The root of a broadcast did not provide a value of the expected type.
    #[error("broadcast root {0} did not provide a value")]
    MissingBroadcastValue(usize),

    /// A rank did not deposit a value of the expected type during a gather.
    #[error("rank {0} did not contribute to the gather")]
    MissingContribution(usize),

    /// A worker panicked while holding shared collective state.
    #[error("collective state was poisoned by a panicking worker")]
    Poisoned,
}

/// The part a worker plays in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Loads the input, aggregates the partial results, composites and writes the output.
    Coordinator,
    /// Only computes its share of the convolution.
    Worker,
}

type Parcel = Box<dyn Any + Send>;

/// Shared state behind the collective operations of one run.
struct Collectives {
    barrier: Barrier,
    slot: Mutex<Option<Parcel>>,
    mailboxes: Mutex<Vec<Option<Parcel>>>,
}

impl Collectives {
    fn new(size: usize) -> Self {
        Self {
            barrier: Barrier::new(size),
            slot: Mutex::new(None),
            mailboxes: Mutex::new((0..size).map(|_| None).collect()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ParallelError> {
    mutex.lock().map_err(|_| ParallelError::Poisoned)
}

/// A fixed group of `N` workers that all execute the same program.
///
/// Each call to [`WorkerGroup::run`] starts the program once on every worker of a dedicated
/// thread pool. Workers exchange data only through the collectives of their [`Communicator`].
///
/// # Example
///
/// ```rust
/// use sharpen_imgproc::parallel::WorkerGroup;
///
/// let group = WorkerGroup::new(4).unwrap();
/// let ranks = group.run(|comm| comm.rank());
/// assert_eq!(ranks, vec![0, 1, 2, 3]);
/// ```
pub struct WorkerGroup {
    pool: rayon::ThreadPool,
    num_workers: usize,
}

impl WorkerGroup {
    /// Create a group of exactly `num_workers` workers.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::InvalidThreadCount`] for zero workers and
    /// [`ParallelError::BuildError`] if the thread pool cannot be created.
    pub fn new(num_workers: usize) -> Result<Self, ParallelError> {
        if num_workers == 0 {
            return Err(ParallelError::InvalidThreadCount(num_workers));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("sharpen-worker-{i}"))
            .build()
            .map_err(|e| ParallelError::BuildError(e.to_string()))?;

        Ok(Self { pool, num_workers })
    }

    /// The number of workers in the group.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Run `f` once on every worker and collect the results in rank order.
    ///
    /// A worker that blocks forever inside a collective stalls the whole group.
    pub fn run<R, F>(&self, f: F) -> Vec<R>
    where
        F: Fn(&Communicator) -> R + Sync,
        R: Send,
    {
        let shared = Collectives::new(self.num_workers);
        self.pool.broadcast(|ctx| {
            let comm = Communicator {
                rank: ctx.index(),
                size: ctx.num_threads(),
                shared: &shared,
            };
            f(&comm)
        })
    }
}

/// A worker's handle on its group: its rank and the collective operations.
///
/// Every worker of the group must call the same collectives in the same order.
pub struct Communicator<'a> {
    rank: usize,
    size: usize,
    shared: &'a Collectives,
}

impl Communicator<'_> {
    /// The index of this worker in `[0, size)`.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The number of workers in the group.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The role of this worker given the rank of the coordinator.
    pub fn role(&self, root: usize) -> Role {
        if self.rank == root {
            Role::Coordinator
        } else {
            Role::Worker
        }
    }

    /// Block until every worker of the group has reached the barrier.
    pub fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn check_root(&self, root: usize) -> Result<(), ParallelError> {
        if root >= self.size {
            return Err(ParallelError::InvalidRoot(root, self.size));
        }
        Ok(())
    }

    /// Send `value` from `root` to every worker.
    ///
    /// Only the root's `value` is used; the other workers pass `None`. Every worker, the root
    /// included, returns its own clone once all of them have received it.
    ///
    /// # Errors
    ///
    /// All workers fail with [`ParallelError::MissingBroadcastValue`] when the root passes
    /// `None`.
    pub fn broadcast<T>(&self, root: usize, value: Option<T>) -> Result<T, ParallelError>
    where
        T: Clone + Send + 'static,
    {
        self.check_root(root)?;

        let posted = if self.rank == root {
            lock(&self.shared.slot).map(|mut slot| {
                *slot = value.map(|v| Box::new(v) as Parcel);
            })
        } else {
            Ok(())
        };
        self.barrier();

        let received = lock(&self.shared.slot).map(|slot| {
            slot.as_ref()
                .and_then(|parcel| parcel.downcast_ref::<T>())
                .cloned()
        });
        self.barrier();

        if self.rank == root {
            lock(&self.shared.slot)?.take();
        }

        posted?;
        received?.ok_or(ParallelError::MissingBroadcastValue(root))
    }

    /// Collect one value from every worker at `root`.
    ///
    /// The root receives `Some` with the values in rank order once every worker has
    /// contributed; the other workers receive `None`.
    pub fn gather<T>(&self, root: usize, value: T) -> Result<Option<Vec<T>>, ParallelError>
    where
        T: Send + 'static,
    {
        self.check_root(root)?;

        let posted = lock(&self.shared.mailboxes).map(|mut mailboxes| {
            mailboxes[self.rank] = Some(Box::new(value) as Parcel);
        });
        self.barrier();

        let collected = if self.rank == root {
            lock(&self.shared.mailboxes).and_then(|mut mailboxes| {
                mailboxes
                    .iter_mut()
                    .enumerate()
                    .map(|(rank, mailbox)| {
                        mailbox
                            .take()
                            .and_then(|parcel| parcel.downcast::<T>().ok())
                            .map(|value| *value)
                            .ok_or(ParallelError::MissingContribution(rank))
                    })
                    .collect::<Result<Vec<T>, ParallelError>>()
                    .map(Some)
            })
        } else {
            Ok(None)
        };
        self.barrier();

        posted?;
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers() {
        assert!(matches!(
            WorkerGroup::new(0),
            Err(ParallelError::InvalidThreadCount(0))
        ));
    }

    #[test]
    fn test_run_is_spmd() -> Result<(), ParallelError> {
        let group = WorkerGroup::new(3)?;
        let out = group.run(|comm| (comm.rank(), comm.size(), comm.role(COORDINATOR_RANK)));
        assert_eq!(
            out,
            vec![
                (0, 3, Role::Coordinator),
                (1, 3, Role::Worker),
                (2, 3, Role::Worker)
            ]
        );
        Ok(())
    }

    #[test]
    fn test_broadcast_replicates_root_value() -> Result<(), ParallelError> {
        let group = WorkerGroup::new(4)?;
        let out = group.run(|comm| {
            let value = (comm.rank() == 2).then(|| vec![comm.rank(); 5]);
            comm.broadcast(2, value)
        });
        for received in out {
            assert_eq!(received?, vec![2; 5]);
        }
        Ok(())
    }

    #[test]
    fn test_broadcast_copies_are_independent() -> Result<(), ParallelError> {
        let group = WorkerGroup::new(3)?;
        let out = group.run(|comm| -> Result<Vec<usize>, ParallelError> {
            let mut data = comm.broadcast(0, (comm.rank() == 0).then(|| vec![0usize; 3]))?;
            data[comm.rank()] = comm.rank() + 1;
            comm.barrier();
            Ok(data)
        });
        assert_eq!(out[0], Ok(vec![1, 0, 0]));
        assert_eq!(out[1], Ok(vec![0, 2, 0]));
        assert_eq!(out[2], Ok(vec![0, 0, 3]));
        Ok(())
    }

    #[test]
    fn test_broadcast_missing_value() -> Result<(), ParallelError> {
        let group = WorkerGroup::new(2)?;
        let out = group.run(|comm| comm.broadcast::<u32>(0, None));
        assert!(out
            .iter()
            .all(|r| *r == Err(ParallelError::MissingBroadcastValue(0))));
        Ok(())
    }

    #[test]
    fn test_broadcast_invalid_root() -> Result<(), ParallelError> {
        let group = WorkerGroup::new(2)?;
        let out = group.run(|comm| comm.broadcast(5, Some(1u8)));
        assert!(out.iter().all(|r| *r == Err(ParallelError::InvalidRoot(5, 2))));
        Ok(())
    }

    #[test]
    fn test_gather_in_rank_order() -> Result<(), ParallelError> {
        let group = WorkerGroup::new(5)?;
        let out = group.run(|comm| comm.gather(COORDINATOR_RANK, comm.rank() * 10));
        assert_eq!(out[0], Ok(Some(vec![0, 10, 20, 30, 40])));
        assert!(out[1..].iter().all(|r| *r == Ok(None)));
        Ok(())
    }

    #[test]
    fn test_collectives_are_reusable() -> Result<(), ParallelError> {
        let group = WorkerGroup::new(3)?;
        let out = group.run(|comm| -> Result<Option<Vec<u64>>, ParallelError> {
            let mut total = 0u64;
            for round in 0..4u64 {
                total += comm.broadcast(1, (comm.rank() == 1).then_some(round))?;
            }
            comm.gather(0, total + comm.rank() as u64)
        });
        assert_eq!(out[0], Ok(Some(vec![6, 7, 8])));
        Ok(())
    }
}
