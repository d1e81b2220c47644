//! Pool utilization counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of managed worker threads (the owner is not counted).
    pub worker_count: usize,

    /// Tasks accepted by `submit`, including resubmitted continuations.
    pub submitted_tasks: u64,

    /// Task bodies that returned normally.
    pub completed_tasks: u64,

    /// Task bodies that panicked.
    pub panicked_tasks: u64,

    /// Submissions that exhausted their probe budget and fell back to a blocking push.
    pub forced_pushes: u64,

    /// Delayed tasks not yet extracted from their queues.
    pub pending_sleepy_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub panicked_tasks: AtomicU64,
    pub forced_pushes: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, pending_sleepy_tasks: usize) -> PoolStats {
        PoolStats {
            worker_count,
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            panicked_tasks: self.panicked_tasks.load(Ordering::Relaxed),
            forced_pushes: self.forced_pushes.load(Ordering::Relaxed),
            pending_sleepy_tasks: pending_sleepy_tasks as u64,
        }
    }
}
