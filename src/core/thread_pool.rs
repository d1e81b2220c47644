//! Priority thread pool with delayed tasks and cooperative joins.
//!
//! The pool owns one [`TokenQueue`] per (priority level, slot) pair and one
//! [`SleepyTaskQueue`] per slot. There is a slot for every managed worker
//! plus one for the owning thread, which takes part in execution through
//! [`ThreadPool::work_while_waiting`] and during teardown.
//!
//! # Design
//!
//! - **Contention-tolerant submission**: try-lock probes rotate across slots;
//!   a blocking push is the last resort
//! - **Delayed tasks**: a worker reserves the earliest sleepy task and sleeps
//!   until its wake instant, yielding to ordinary work that shows up meanwhile
//! - **Draining shutdown**: `shut_down` only stops idle waiting; everything
//!   queued still runs, on workers or on the owner during drop
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_thread_pool::core::{make_join_signal, make_simple_task, ThreadPool};
//! use std::time::Duration;
//!
//! let pool = ThreadPool::new(2, 4, 20, Duration::from_millis(500))?;
//!
//! let signal = make_join_signal();
//! let token = pool.get_join_token(&signal);
//! for i in 0..8 {
//!     let token = token.clone();
//!     pool.submit(make_simple_task(1, move || {
//!         crunch(i);
//!         drop(token);
//!     }).into());
//! }
//! let join_condition = pool.get_join_condition(token, &signal);
//! pool.work_while_waiting(&join_condition, 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ThreadPoolConfig;
use crate::util::clock;

use super::context::WorkerContext;
use super::error::SchedulerError;
use super::join::{JoinSignal, JoinToken};
use super::sleepy_queue::{SleepingTaskHandle, SleepyTaskQueue};
use super::stats::{PoolCounters, PoolStats};
use super::task::{execute_task, fire_notification, ScopedNotification, SimpleTask, SleepyTask, TaskOutcome, TaskPriority, TaskVariant};
use super::token_queue::TokenQueue;
use super::waiter_manager::{ShutdownPolicy, WaitOutcome, WaiterManager};

/// State shared between the pool handle and its workers.
struct PoolCore {
    pool_id: Uuid,
    max_priority_level: TaskPriority,
    num_queues: usize,
    num_submit_cycle_attempts: usize,
    max_wait_duration: Duration,
    /// Indexed `[priority][slot]`.
    task_queues: Vec<Vec<TokenQueue<SimpleTask>>>,
    /// Indexed `[slot]`.
    sleepy_queues: Vec<SleepyTaskQueue>,
    waiter_manager: WaiterManager,
    submit_counter: AtomicUsize,
    num_pending_sleepy_tasks: AtomicUsize,
    counters: PoolCounters,
}

impl PoolCore {
    fn new(pool_id: Uuid, config: &ThreadPoolConfig) -> Self {
        let num_queues = config.num_managed_workers + 1;
        let task_queues = (0..=config.max_priority_level)
            .map(|_| {
                (0..num_queues)
                    .map(|_| TokenQueue::new(config.max_queue_size))
                    .collect()
            })
            .collect();

        Self {
            pool_id,
            max_priority_level: config.max_priority_level,
            num_queues,
            num_submit_cycle_attempts: config.num_submit_cycle_attempts,
            max_wait_duration: config.max_wait_duration(),
            task_queues,
            sleepy_queues: (0..num_queues).map(|_| SleepyTaskQueue::new()).collect(),
            waiter_manager: WaiterManager::new(config.num_managed_workers),
            submit_counter: AtomicUsize::new(0),
            num_pending_sleepy_tasks: AtomicUsize::new(0),
            counters: PoolCounters::default(),
        }
    }

    fn clamp_priority(&self, priority: TaskPriority) -> TaskPriority {
        priority.min(self.max_priority_level)
    }

    fn num_probes(&self) -> usize {
        self.num_queues * self.num_submit_cycle_attempts
    }

    // ---------------------------------------------------------------------
    // Submission

    fn submit(&self, task: TaskVariant) -> bool {
        let submitted = match task {
            TaskVariant::Empty => true,
            TaskVariant::Simple(task) => {
                self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                self.submit_simple_task(task)
            }
            TaskVariant::Sleepy(task) => {
                self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                self.submit_sleepy_task(task)
            }
            TaskVariant::Notification(notification) => {
                if !fire_notification(notification) {
                    self.counters.panicked_tasks.fetch_add(1, Ordering::Relaxed);
                }
                true
            }
        };
        self.perform_sleepy_queue_maintenance();
        submitted
    }

    fn submit_simple_task(&self, mut task: SimpleTask) -> bool {
        task.priority = self.clamp_priority(task.priority);
        let queues = &self.task_queues[usize::from(task.priority)];
        let start = self.submit_counter.fetch_add(1, Ordering::Relaxed);

        for attempt in 0..self.num_probes() {
            let index = start.wrapping_add(attempt) % self.num_queues;
            match queues[index].try_push(task) {
                Ok(()) => {
                    self.waiter_manager.notify_one();
                    return true;
                }
                Err(rejected) => task = rejected.into_inner(),
            }
        }

        let index = start % self.num_queues;
        debug!(
            pool_id = %self.pool_id,
            priority = task.priority,
            queue_index = index,
            "Probe budget exhausted; forcing task into queue"
        );
        queues[index].force_push(task);
        self.counters.forced_pushes.fetch_add(1, Ordering::Relaxed);
        self.waiter_manager.notify_one();
        true
    }

    fn submit_sleepy_task(&self, mut task: SleepyTask) -> bool {
        let now = clock::now();
        task.simple_task.priority = self.clamp_priority(task.simple_task.priority);
        task.wake_time.anchor(now);
        if task.is_awake(now) {
            return self.submit_simple_task(task.simple_task);
        }

        // count first so maintenance never sees the task before the counter
        self.num_pending_sleepy_tasks.fetch_add(1, Ordering::AcqRel);
        let start = self.submit_counter.fetch_add(1, Ordering::Relaxed);

        for attempt in 0..self.num_probes() {
            let index = start.wrapping_add(attempt) % self.num_queues;
            match self.sleepy_queues[index].try_push(task, now) {
                Ok(()) => {
                    self.waiter_manager.notify_one();
                    return true;
                }
                Err(rejected) => task = rejected.into_inner(),
            }
        }

        let index = start % self.num_queues;
        debug!(
            pool_id = %self.pool_id,
            queue_index = index,
            "Probe budget exhausted; forcing sleepy task into queue"
        );
        self.sleepy_queues[index].force_push(task, now);
        self.counters.forced_pushes.fetch_add(1, Ordering::Relaxed);
        self.waiter_manager.notify_one();
        true
    }

    fn perform_sleepy_queue_maintenance(&self) {
        if self.num_pending_sleepy_tasks.load(Ordering::Acquire) == 0 {
            return;
        }

        let now = clock::now();
        let awake: Vec<SleepingTaskHandle> = self
            .sleepy_queues
            .iter()
            .flat_map(|queue| queue.try_perform_maintenance(now))
            .collect();

        for handle in awake {
            if let Some(task) = self.extract_sleepy_task(&handle) {
                self.submit_simple_task(task);
            }
        }
    }

    fn extract_sleepy_task(&self, handle: &SleepingTaskHandle) -> Option<SimpleTask> {
        let task = handle.take_reserved()?;
        self.num_pending_sleepy_tasks.fetch_sub(1, Ordering::AcqRel);
        Some(task)
    }

    // ---------------------------------------------------------------------
    // Retrieval

    /// Pop the most urgent immediately available task at or below
    /// `max_task_priority` in urgency, starting at `worker_index`'s own queue.
    fn try_get_simple_task(&self, max_task_priority: TaskPriority, worker_index: usize) -> Option<SimpleTask> {
        let first_level = self.clamp_priority(max_task_priority);
        for priority in first_level..=self.max_priority_level {
            let queues = &self.task_queues[usize::from(priority)];
            for offset in 0..self.num_queues {
                let index = (worker_index + offset) % self.num_queues;
                if let Ok(task) = queues[index].try_pop() {
                    return Some(task);
                }
            }
        }
        None
    }

    /// Whether any queue holds a task on a level below `floor`.
    fn has_tasks_more_urgent_than(&self, floor: TaskPriority) -> bool {
        let floor = usize::from(self.clamp_priority(floor));
        self.task_queues[..floor]
            .iter()
            .flatten()
            .any(|queue| !queue.is_empty())
    }

    fn try_reserve_sleepy_task(
        &self,
        max_task_priority: TaskPriority,
        worker_index: usize,
        reserved: &mut Option<SleepingTaskHandle>,
    ) {
        for offset in 0..self.num_queues {
            let index = (worker_index + offset) % self.num_queues;
            self.sleepy_queues[index].try_swap(max_task_priority, reserved);
        }
    }

    /// Find a task for `worker_index`, waiting on a reserved sleepy task via
    /// `wait_fn` if there is no immediate work.
    fn try_get_task_to_run(
        &self,
        max_task_priority: TaskPriority,
        worker_index: usize,
        wait_fn: &dyn Fn(Instant) -> WaitOutcome,
    ) -> Option<SimpleTask> {
        if let Some(task) = self.try_get_simple_task(max_task_priority, worker_index) {
            return Some(task);
        }

        let mut reserved: Option<SleepingTaskHandle> = None;
        loop {
            self.try_reserve_sleepy_task(max_task_priority, worker_index, &mut reserved);
            let handle = reserved.clone()?;

            let outcome = wait_fn(handle.wake_instant());

            if outcome == WaitOutcome::ConditionTriggered {
                handle.release();
                self.waiter_manager.notify_one();
                return None;
            }

            if outcome == WaitOutcome::ShuttingDown || handle.is_awake(clock::now()) {
                if let Some(task) = self.extract_sleepy_task(&handle) {
                    // the notification that woke us may have been meant for someone else
                    if outcome != WaitOutcome::Timeout {
                        self.waiter_manager.notify_one();
                    }
                    return Some(task);
                }
                reserved = None;
                continue;
            }

            if let Some(task) = self.try_get_simple_task(max_task_priority, worker_index) {
                handle.release();
                return Some(task);
            }
        }
    }

    fn run_task(&self, task: SimpleTask) {
        let outcome = execute_task(task);
        match outcome {
            TaskOutcome::Completed(_) => self.counters.completed_tasks.fetch_add(1, Ordering::Relaxed),
            TaskOutcome::Panicked => self.counters.panicked_tasks.fetch_add(1, Ordering::Relaxed),
        };
        self.submit(outcome.into_continuation());
    }

    // ---------------------------------------------------------------------
    // Participation

    fn run_as_worker(&self, context: WorkerContext) {
        let worker_index = context.worker_index();
        debug!(pool_id = %context.pool_id(), worker_index, "Worker thread started");

        let wait_for_sleepy = |wake_instant: Instant| {
            self.waiter_manager
                .sleepy_wait_until(worker_index, wake_instant, ShutdownPolicy::ExitEarly)
        };

        loop {
            if let Some(task) = self.try_get_task_to_run(0, worker_index, &wait_for_sleepy) {
                self.run_task(task);
                continue;
            }

            // bounded so a missed notification only delays us
            let outcome = self.waiter_manager.wait_for(
                worker_index,
                self.max_wait_duration,
                ShutdownPolicy::ExitEarly,
            );
            if outcome == WaitOutcome::ShuttingDown {
                break;
            }
        }

        debug!(pool_id = %context.pool_id(), worker_index, "Worker thread exiting");
    }

    fn work_while_waiting(
        &self,
        waiter_index: usize,
        condition: &dyn Fn() -> bool,
        deadline: Option<Instant>,
        max_task_priority: TaskPriority,
    ) -> WaitOutcome {
        let deadline_passed = || deadline.is_some_and(|deadline| clock::now() >= deadline);
        let wake_condition = || condition() || deadline_passed();

        let wait_for_sleepy = |wake_instant: Instant| {
            let until = deadline.map_or(wake_instant, |deadline| deadline.min(wake_instant));
            self.waiter_manager.conditional_wait_until(
                waiter_index,
                &wake_condition,
                until,
                ShutdownPolicy::Wait,
            )
        };

        loop {
            if condition() {
                return WaitOutcome::ConditionTriggered;
            }
            if deadline_passed() {
                return WaitOutcome::Timeout;
            }

            if let Some(task) = self.try_get_task_to_run(max_task_priority, waiter_index, &wait_for_sleepy) {
                self.run_task(task);
                continue;
            }

            let poll_deadline = clock::deadline_after(self.max_wait_duration);
            let until = deadline.map_or(poll_deadline, |deadline| deadline.min(poll_deadline));
            let outcome = self.waiter_manager.conditional_wait_until(
                waiter_index,
                &wake_condition,
                until,
                ShutdownPolicy::Wait,
            );

            // the wakeup may have been for a task our floor hides; pass it on
            if outcome == WaitOutcome::DoneWaiting && self.has_tasks_more_urgent_than(max_task_priority) {
                self.waiter_manager.notify_one();
            }
        }
    }

    fn stats(&self, worker_count: usize) -> PoolStats {
        self.counters.snapshot(
            worker_count,
            self.num_pending_sleepy_tasks.load(Ordering::Acquire),
        )
    }
}

/// What teardown managed to do. Teardown never fails; anomalies are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Workers joined cleanly.
    pub joined_workers: usize,
    /// Workers whose thread panicked outside a task.
    pub panicked_workers: usize,
    /// Tasks run by the owning thread after the workers were joined.
    pub drained_tasks: usize,
}

/// Priority thread pool. See the [module documentation](self).
///
/// Should be dropped on the thread that created it. Dropping it elsewhere logs
/// an error; teardown still runs.
pub struct ThreadPool {
    core: Arc<PoolCore>,
    owner_context: WorkerContext,
    owner_thread: ThreadId,
    workers: Vec<JoinHandle<()>>,
    torn_down: bool,
}

impl ThreadPool {
    /// Create a pool with `num_managed_workers` spawned threads.
    ///
    /// The remaining settings keep their [`ThreadPoolConfig`] defaults.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` for a zero probe budget or wait,
    /// `SchedulerError::WorkerSpawn` if a thread could not be started.
    pub fn new(
        max_priority_level: TaskPriority,
        num_managed_workers: usize,
        num_submit_cycle_attempts: usize,
        max_wait_duration: Duration,
    ) -> Result<Self, SchedulerError> {
        let config = ThreadPoolConfig::new()
            .with_max_priority_level(max_priority_level)
            .with_num_managed_workers(num_managed_workers)
            .with_num_submit_cycle_attempts(num_submit_cycle_attempts)
            .with_max_wait_duration(max_wait_duration);
        Self::from_config(&config)
    }

    /// Create a pool from a configuration.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` if validation fails,
    /// `SchedulerError::WorkerSpawn` if a thread could not be started.
    pub fn from_config(config: &ThreadPoolConfig) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let pool_id = Uuid::new_v4();
        let core = Arc::new(PoolCore::new(pool_id, config));

        let mut workers = Vec::with_capacity(config.num_managed_workers);
        for worker_index in 1..=config.num_managed_workers {
            match spawn_worker(&core, WorkerContext::new(pool_id, worker_index), config) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(pool_id = %pool_id, worker_index, error = %e, "Failed to spawn worker thread");
                    core.waiter_manager.shut_down();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(SchedulerError::WorkerSpawn(e.to_string()));
                }
            }
        }

        info!(
            pool_id = %pool_id,
            num_managed_workers = config.num_managed_workers,
            max_priority_level = config.max_priority_level,
            num_submit_cycle_attempts = config.num_submit_cycle_attempts,
            max_wait_ms = config.max_wait_duration_ms,
            "ThreadPool initialized"
        );

        Ok(Self {
            core,
            owner_context: WorkerContext::owner(pool_id),
            owner_thread: thread::current().id(),
            workers,
            torn_down: false,
        })
    }

    /// Unique id of this pool, used in log fields.
    #[must_use]
    pub fn pool_id(&self) -> Uuid {
        self.core.pool_id
    }

    /// Least urgent priority level.
    #[must_use]
    pub fn max_priority_level(&self) -> TaskPriority {
        self.core.max_priority_level
    }

    /// Number of spawned worker threads.
    #[must_use]
    pub fn num_managed_workers(&self) -> usize {
        self.core.num_queues - 1
    }

    fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner_thread
    }

    /// Submit a task, a continuation, or a notification.
    ///
    /// Never blocks for long and never fails under contention. Returns
    /// `false` only on an unrecoverable internal error.
    pub fn submit(&self, task: TaskVariant) -> bool {
        self.core.submit(task)
    }

    /// Run at most one immediately available task on the calling thread.
    ///
    /// Returns whether a task ran. Never waits for delayed tasks.
    pub fn try_run_next_task(&self, max_task_priority: TaskPriority) -> bool {
        debug_assert!(self.is_owner_thread(), "only the owning thread may borrow the owner slot");
        self.core.perform_sleepy_queue_maintenance();
        match self
            .core
            .try_get_simple_task(max_task_priority, self.owner_context.worker_index())
        {
            Some(task) => {
                self.core.run_task(task);
                true
            }
            None => false,
        }
    }

    /// Token whose release sets `signal` and wakes this thread's conditional slot.
    ///
    /// Clone the token into every task being joined on, then hand the
    /// original to [`get_join_condition`](Self::get_join_condition).
    #[must_use]
    pub fn get_join_token(&self, signal: &JoinSignal) -> JoinToken {
        debug_assert!(self.is_owner_thread(), "join tokens belong to the owning thread");
        let core: Weak<PoolCore> = Arc::downgrade(&self.core);
        let signal = Arc::clone(signal);
        let waiter_index = self.owner_context.worker_index();

        JoinToken::new(ScopedNotification::new(move || {
            let set_signal = || signal.store(true, Ordering::Release);
            match core.upgrade() {
                Some(core) => core.waiter_manager.notify_conditional_waiter(waiter_index, set_signal),
                None => set_signal(),
            }
        }))
    }

    /// Release the caller's copy of `token` and return the join predicate.
    pub fn get_join_condition(
        &self,
        token: JoinToken,
        signal: &JoinSignal,
    ) -> impl Fn() -> bool + Send + Sync + 'static {
        token.release();
        let signal = Arc::clone(signal);
        move || signal.load(Ordering::Acquire)
    }

    /// Run pool tasks on this thread until `condition` holds.
    ///
    /// Only tasks at or below `max_task_priority` in urgency are picked up.
    /// Returns [`WaitOutcome::ConditionTriggered`].
    pub fn work_while_waiting<C>(&self, condition: C, max_task_priority: TaskPriority) -> WaitOutcome
    where
        C: Fn() -> bool,
    {
        debug_assert!(self.is_owner_thread(), "only the owning thread may borrow the owner slot");
        self.core.work_while_waiting(
            self.owner_context.worker_index(),
            &condition,
            None,
            max_task_priority,
        )
    }

    /// Run pool tasks on this thread until `condition` holds or `deadline` passes.
    pub fn work_while_waiting_until_condition<C>(
        &self,
        condition: C,
        deadline: Instant,
        max_task_priority: TaskPriority,
    ) -> WaitOutcome
    where
        C: Fn() -> bool,
    {
        debug_assert!(self.is_owner_thread(), "only the owning thread may borrow the owner slot");
        self.core.work_while_waiting(
            self.owner_context.worker_index(),
            &condition,
            Some(deadline),
            max_task_priority,
        )
    }

    /// Run pool tasks on this thread until `deadline`. Returns [`WaitOutcome::Timeout`].
    pub fn work_while_waiting_until(&self, deadline: Instant, max_task_priority: TaskPriority) -> WaitOutcome {
        self.work_while_waiting_until_condition(|| false, deadline, max_task_priority)
    }

    /// Run pool tasks on this thread for `duration`. Returns [`WaitOutcome::Timeout`].
    pub fn work_while_waiting_for(&self, duration: Duration, max_task_priority: TaskPriority) -> WaitOutcome {
        self.work_while_waiting_until(clock::deadline_after(duration), max_task_priority)
    }

    /// Stop idle waiting. Idempotent and non-blocking; queued work still runs.
    pub fn shut_down(&self) {
        if !self.core.waiter_manager.is_shutting_down() {
            info!(pool_id = %self.core.pool_id, "Shutting down thread pool");
        }
        self.core.waiter_manager.shut_down();
    }

    /// Whether [`shut_down`](Self::shut_down) has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.core.waiter_manager.is_shutting_down()
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.core.stats(self.workers.len())
    }

    /// Shut down, join every worker, and run leftover tasks on this thread.
    pub fn shut_down_and_drain(mut self) -> TeardownReport {
        self.teardown()
    }

    fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.torn_down {
            return report;
        }
        self.torn_down = true;
        self.shut_down();

        for (slot, handle) in self.workers.drain(..).enumerate() {
            if handle.join().is_ok() {
                report.joined_workers += 1;
            } else {
                warn!(pool_id = %self.core.pool_id, worker_index = slot + 1, "Worker thread panicked");
                report.panicked_workers += 1;
            }
        }

        let owner_index = self.owner_context.worker_index();
        let exit_immediately = |_: Instant| WaitOutcome::ShuttingDown;
        while let Some(task) = self.core.try_get_task_to_run(0, owner_index, &exit_immediately) {
            self.core.run_task(task);
            report.drained_tasks += 1;
        }

        info!(
            pool_id = %self.core.pool_id,
            joined_workers = report.joined_workers,
            panicked_workers = report.panicked_workers,
            drained_tasks = report.drained_tasks,
            "Thread pool shut down complete"
        );
        report
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.is_owner_thread() {
            error!(pool_id = %self.core.pool_id, "ThreadPool dropped on a thread that does not own it");
        }
        self.teardown();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("pool_id", &self.core.pool_id)
            .field("max_priority_level", &self.core.max_priority_level)
            .field("num_managed_workers", &self.workers.len())
            .field("shutting_down", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}

/// Spawn a worker thread.
fn spawn_worker(
    core: &Arc<PoolCore>,
    context: WorkerContext,
    config: &ThreadPoolConfig,
) -> std::io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new()
        .name(format!("{}-{}", config.thread_name_prefix, context.worker_index()));
    if let Some(stack_size) = config.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }
    let core = Arc::clone(core);
    builder.spawn(move || core.run_as_worker(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{make_simple_task, make_sleepy_task};
    use parking_lot::Mutex;

    fn owner_only_pool(max_priority_level: TaskPriority) -> ThreadPool {
        ThreadPool::new(max_priority_level, 0, 4, Duration::from_millis(50)).unwrap()
    }

    #[test]
    fn test_priority_clamped_on_submit() {
        let pool = owner_only_pool(2);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        assert!(pool.submit(make_simple_task(200, move || seen_clone.lock().push("clamped")).into()));

        // only reachable from the least urgent level
        assert!(pool.core.task_queues[2].iter().any(|q| !q.is_empty()));
        assert!(pool.try_run_next_task(2));
        assert_eq!(*seen.lock(), vec!["clamped"]);
    }

    #[test]
    fn test_awake_sleepy_task_skips_sleepy_queue() {
        let pool = owner_only_pool(1);
        assert!(pool.submit(make_sleepy_task(0, Duration::ZERO, || ()).into()));
        assert!(pool.core.sleepy_queues.iter().all(SleepyTaskQueue::is_empty));
        assert_eq!(pool.stats().pending_sleepy_tasks, 0);
        assert!(pool.try_run_next_task(0));
    }

    #[test]
    fn test_pending_sleepy_task_is_counted() {
        let pool = owner_only_pool(1);
        assert!(pool.submit(make_sleepy_task(0, Duration::from_secs(60), || ()).into()));
        assert_eq!(pool.stats().pending_sleepy_tasks, 1);
        assert!(!pool.try_run_next_task(0));
    }

    #[test]
    fn test_forced_push_when_queues_full() {
        let config = ThreadPoolConfig::new()
            .with_num_managed_workers(0)
            .with_max_queue_size(1)
            .with_num_submit_cycle_attempts(1)
            .with_max_wait_duration(Duration::from_millis(20));
        let pool = ThreadPool::from_config(&config).unwrap();

        for _ in 0..3 {
            assert!(pool.submit(make_simple_task(0, || ()).into()));
        }
        assert_eq!(pool.stats().forced_pushes, 2);

        let report = pool.shut_down_and_drain();
        assert_eq!(report.drained_tasks, 3);
    }

    #[test]
    fn test_notification_variant_runs_on_submit() {
        let pool = owner_only_pool(0);
        let signal = crate::core::join::make_join_signal();
        let signal_clone = Arc::clone(&signal);
        let notification = ScopedNotification::new(move || signal_clone.store(true, Ordering::Release));

        assert!(pool.submit(TaskVariant::Notification(notification)));
        assert!(signal.load(Ordering::Acquire));
    }

    #[test]
    fn test_join_token_outliving_pool_still_sets_signal() {
        let signal = crate::core::join::make_join_signal();
        let token = {
            let pool = owner_only_pool(0);
            pool.get_join_token(&signal)
        };
        assert!(!signal.load(Ordering::Acquire));
        drop(token);
        assert!(signal.load(Ordering::Acquire));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ThreadPool::new(1, 0, 0, Duration::from_millis(10));
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }

    #[test]
    fn test_drop_on_foreign_thread_still_tears_down() {
        let pool = ThreadPool::new(0, 1, 4, Duration::from_millis(20)).unwrap();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        pool.submit(make_sleepy_task(0, Duration::from_secs(3600), move || {
            ran_clone.store(true, Ordering::SeqCst);
        })
        .into());
        let core = Arc::downgrade(&pool.core);

        let result = thread::spawn(move || drop(pool)).join();

        assert!(result.is_ok());
        assert!(ran.load(Ordering::SeqCst));
        // workers hold the core; it is gone only once they were joined
        assert!(core.upgrade().is_none());
    }

    #[test]
    fn test_sub_millisecond_wait_accepted() {
        let pool = ThreadPool::new(0, 0, 4, Duration::from_micros(500)).unwrap();
        assert_eq!(pool.core.max_wait_duration, Duration::from_millis(1));
    }

    #[test]
    fn test_has_tasks_more_urgent_than_floor() {
        let pool = owner_only_pool(2);
        assert!(!pool.core.has_tasks_more_urgent_than(2));

        pool.submit(make_simple_task(1, || ()).into());
        assert!(pool.core.has_tasks_more_urgent_than(2));
        assert!(!pool.core.has_tasks_more_urgent_than(1));
        assert!(!pool.core.has_tasks_more_urgent_than(0));
    }
}
