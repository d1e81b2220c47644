//! Core scheduling primitives and the thread pool built on them.

pub mod context;
pub mod error;
pub mod join;
pub mod sleepy_queue;
pub mod stats;
pub mod task;
pub mod thread_pool;
pub mod token_queue;
pub mod waiter_manager;

pub use context::{WorkerContext, OWNER_WORKER_INDEX};
pub use error::{AppResult, SchedulerError};
pub use join::{join_signal_is_set, make_join_signal, JoinSignal, JoinToken};
pub use sleepy_queue::{SleepingTask, SleepingTaskHandle, SleepingTaskStatus, SleepyTaskQueue};
pub use stats::PoolStats;
pub use task::{
    make_simple_task, make_sleepy_task, make_sleepy_task_at, ScopedNotification, SimpleTask,
    SleepyTask, TaskBody, TaskPriority, TaskVariant, WakeTime,
};
pub use thread_pool::{TeardownReport, ThreadPool};
pub use token_queue::{TokenQueue, TryPopError, TryPushError};
pub use waiter_manager::{ShutdownPolicy, WaitOutcome, WaiterManager};
