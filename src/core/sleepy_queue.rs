//! Time-gated task queue with a claim/release/kill protocol.
//!
//! Each accepted [`SleepyTask`] becomes a [`SleepingTask`] that is allocated
//! once and shared through a [`SleepingTaskHandle`]. A worker that wants to
//! wait on a task first reserves it; only the reserver may extract the task or
//! release it again, so a delayed task is serviced by exactly one worker.
//!
//! Dead entries are not removed eagerly. They are swept by
//! [`SleepyTaskQueue::try_perform_maintenance`], which also detaches
//! unclaimed tasks that have woken up so they can be submitted as ordinary
//! work.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::task::{SimpleTask, SleepyTask, TaskPriority};
use super::token_queue::TryPushError;

/// Claim status of a [`SleepingTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SleepingTaskStatus {
    /// Waiting in its queue; any worker may reserve it.
    Unclaimed = 0,
    /// Reserved by one worker.
    Reserved = 1,
    /// Task extracted or discarded. Terminal.
    Dead = 2,
}

impl SleepingTaskStatus {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unclaimed,
            1 => Self::Reserved,
            _ => Self::Dead,
        }
    }
}

/// Queue-resident wrapper around a delayed task.
pub struct SleepingTask {
    wake_instant: Instant,
    priority: TaskPriority,
    status: AtomicU8,
    task: Mutex<Option<SimpleTask>>,
}

/// Stable shared handle to a [`SleepingTask`].
pub type SleepingTaskHandle = Arc<SleepingTask>;

impl SleepingTask {
    /// Wrap a sleepy task. An unanchored wake time is anchored to `now`.
    #[must_use]
    pub fn new(sleepy_task: SleepyTask, now: Instant) -> SleepingTaskHandle {
        let SleepyTask {
            simple_task,
            mut wake_time,
        } = sleepy_task;
        wake_time.anchor(now);
        Arc::new(Self {
            wake_instant: wake_time.wake_instant(now),
            priority: simple_task.priority,
            status: AtomicU8::new(SleepingTaskStatus::Unclaimed as u8),
            task: Mutex::new(Some(simple_task)),
        })
    }

    /// Effective wake instant.
    #[must_use]
    pub const fn wake_instant(&self) -> Instant {
        self.wake_instant
    }

    /// Priority of the wrapped task.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Current claim status.
    #[must_use]
    pub fn status(&self) -> SleepingTaskStatus {
        SleepingTaskStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Whether the task may run at `now`.
    #[must_use]
    pub fn is_awake(&self, now: Instant) -> bool {
        self.wake_instant <= now
    }

    fn transition(&self, from: SleepingTaskStatus, to: SleepingTaskStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// UNCLAIMED -> RESERVED.
    pub fn try_reserve(&self) -> bool {
        self.transition(SleepingTaskStatus::Unclaimed, SleepingTaskStatus::Reserved)
    }

    /// RESERVED -> UNCLAIMED. Only the reserving worker should call this.
    pub fn release(&self) -> bool {
        self.transition(SleepingTaskStatus::Reserved, SleepingTaskStatus::Unclaimed)
    }

    /// Extract the task from a reserved entry and mark it DEAD.
    ///
    /// Returns `None` if the entry is not reserved.
    pub fn take_reserved(&self) -> Option<SimpleTask> {
        if !self.transition(SleepingTaskStatus::Reserved, SleepingTaskStatus::Dead) {
            return None;
        }
        self.task.lock().take()
    }
}

impl std::fmt::Debug for SleepingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SleepingTask")
            .field("wake_instant", &self.wake_instant)
            .field("priority", &self.priority)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Sleeping tasks ordered by ascending wake instant.
#[derive(Debug, Default)]
pub struct SleepyTaskQueue {
    // sorted by wake instant; FIFO among equal instants
    tasks: Mutex<Vec<SleepingTaskHandle>>,
}

fn insert_sorted(tasks: &mut Vec<SleepingTaskHandle>, handle: SleepingTaskHandle) {
    let position = tasks.partition_point(|t| t.wake_instant <= handle.wake_instant);
    tasks.insert(position, handle);
}

impl SleepyTaskQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert without blocking.
    ///
    /// # Errors
    ///
    /// Hands the task back as [`TryPushError::TryLockFail`] if the lock is contended.
    pub fn try_push(&self, task: SleepyTask, now: Instant) -> Result<(), TryPushError<SleepyTask>> {
        let Some(mut tasks) = self.tasks.try_lock() else {
            return Err(TryPushError::TryLockFail(task));
        };
        insert_sorted(&mut tasks, SleepingTask::new(task, now));
        Ok(())
    }

    /// Insert, waiting for the lock.
    pub fn force_push(&self, task: SleepyTask, now: Instant) {
        let handle = SleepingTask::new(task, now);
        insert_sorted(&mut self.tasks.lock(), handle);
    }

    /// Reserve the earliest-waking unclaimed task whose priority level is at
    /// or below `max_task_priority` in urgency (numerically `>=`).
    ///
    /// If `reserved` already holds a task waking no later than the candidate,
    /// nothing changes. Otherwise the previous reservation is released and
    /// replaced. Returns `true` if `reserved` now holds a new task.
    pub fn try_swap(
        &self,
        max_task_priority: TaskPriority,
        reserved: &mut Option<SleepingTaskHandle>,
    ) -> bool {
        let Some(tasks) = self.tasks.try_lock() else {
            return false;
        };

        let candidate = tasks.iter().find(|t| {
            t.priority >= max_task_priority && t.status() == SleepingTaskStatus::Unclaimed
        });
        let Some(candidate) = candidate else {
            return false;
        };
        if let Some(current) = reserved.as_ref() {
            if current.wake_instant <= candidate.wake_instant {
                return false;
            }
        }
        if !candidate.try_reserve() {
            return false;
        }
        if let Some(previous) = reserved.replace(Arc::clone(candidate)) {
            previous.release();
        }
        true
    }

    /// Sweep dead entries and detach unclaimed entries that are awake at `now`.
    ///
    /// Detached entries come back reserved, earliest first, ready for
    /// [`SleepingTask::take_reserved`]. Returns nothing if the lock is contended.
    pub fn try_perform_maintenance(&self, now: Instant) -> Vec<SleepingTaskHandle> {
        let Some(mut tasks) = self.tasks.try_lock() else {
            return Vec::new();
        };

        let mut awake = Vec::new();
        tasks.retain(|t| match t.status() {
            SleepingTaskStatus::Dead => false,
            SleepingTaskStatus::Unclaimed if t.is_awake(now) && t.try_reserve() => {
                awake.push(Arc::clone(t));
                false
            }
            _ => true,
        });
        awake
    }

    /// Number of entries, including dead ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether the queue holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}
