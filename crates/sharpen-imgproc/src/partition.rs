use crate::parallel::ParallelError;

/// Cyclic (round-robin) assignment of linear pixel indices to workers.
///
/// The pixel at linear index `p` belongs to worker `p mod N`. Every worker derives the same
/// assignment from `N` alone, so ownership never has to be communicated.
///
/// # Example
///
/// ```rust
/// use sharpen_imgproc::partition::CyclicPartition;
///
/// let partition = CyclicPartition::new(3).unwrap();
/// assert_eq!(partition.owner(7), 1);
/// assert_eq!(partition.indices(1, 8).collect::<Vec<_>>(), vec![1, 4, 7]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclicPartition {
    num_workers: usize,
}

impl CyclicPartition {
    /// Create a partition over `num_workers` workers.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::InvalidThreadCount`] when `num_workers` is zero.
    pub fn new(num_workers: usize) -> Result<Self, ParallelError> {
        if num_workers == 0 {
            return Err(ParallelError::InvalidThreadCount(num_workers));
        }
        Ok(Self { num_workers })
    }

    /// The partition of a single worker that owns every pixel.
    pub fn single() -> Self {
        Self { num_workers: 1 }
    }

    /// The number of workers `N`.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// The worker that owns linear index `p`.
    #[inline]
    pub fn owner(&self, p: usize) -> usize {
        p % self.num_workers
    }

    /// Whether `worker` owns linear index `p`.
    #[inline]
    pub fn owns(&self, worker: usize, p: usize) -> bool {
        self.owner(p) == worker
    }

    /// The linear indices in `[0, total)` owned by `worker`, in increasing order.
    ///
    /// A worker index at or beyond `N` owns nothing.
    pub fn indices(&self, worker: usize, total: usize) -> impl Iterator<Item = usize> {
        let start = if worker < self.num_workers {
            worker
        } else {
            total
        };
        (start..total).step_by(self.num_workers)
    }

    /// The number of indices in `[0, total)` owned by `worker`.
    pub fn count(&self, worker: usize, total: usize) -> usize {
        if worker >= self.num_workers || worker >= total {
            return 0;
        }
        (total - worker).div_ceil(self.num_workers)
    }
}
