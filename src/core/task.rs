//! Task value types: what a unit of work is and when it becomes eligible.
//!
//! A task body is a single-invocation closure that returns a [`TaskVariant`]
//! continuation. Any non-empty continuation is resubmitted to the pool that
//! ran the task.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::error;

use crate::util::clock::saturating_instant_after;

/// Priority level of a task. `0` is the most urgent.
pub type TaskPriority = u8;

/// Boxed single-invocation task body.
pub type TaskBody = Box<dyn FnOnce() -> TaskVariant + Send + 'static>;

/// The instant at or after which a delayed task becomes eligible.
///
/// A wake time without a `start_time` is anchored to "now" when it is
/// submitted. Once anchored, the start time never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeTime {
    start_time: Option<Instant>,
    duration: Duration,
}

impl WakeTime {
    /// Wake time `duration` after submission.
    #[must_use]
    pub const fn after(duration: Duration) -> Self {
        Self {
            start_time: None,
            duration,
        }
    }

    /// Wake time `duration` after an explicit `start_time`.
    #[must_use]
    pub const fn anchored(start_time: Instant, duration: Duration) -> Self {
        Self {
            start_time: Some(start_time),
            duration,
        }
    }

    /// Wake time pinned to an absolute instant.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self::anchored(instant, Duration::ZERO)
    }

    /// Anchor start time, if not yet set.
    pub fn anchor(&mut self, now: Instant) {
        if self.start_time.is_none() {
            self.start_time = Some(now);
        }
    }

    /// Anchored start time, if any.
    #[must_use]
    pub const fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// Delay relative to the start time.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Effective wake instant. An unanchored wake time is measured from `now`.
    #[must_use]
    pub fn wake_instant(&self, now: Instant) -> Instant {
        saturating_instant_after(self.start_time.unwrap_or(now), self.duration)
    }
}

/// An immediately runnable unit of work.
pub struct SimpleTask {
    /// Priority level, clamped by the pool on submission.
    pub priority: TaskPriority,
    /// The task body.
    pub task: TaskBody,
}

impl fmt::Debug for SimpleTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleTask")
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// A task gated on a wake time.
#[derive(Debug)]
pub struct SleepyTask {
    /// The work to run once awake.
    pub simple_task: SimpleTask,
    /// When the task becomes eligible.
    pub wake_time: WakeTime,
}

impl SleepyTask {
    /// Whether the task may run at `now`.
    #[must_use]
    pub fn is_awake(&self, now: Instant) -> bool {
        self.wake_time.wake_instant(now) <= now
    }
}

/// A callback that runs exactly once: on [`ScopedNotification::notify`] or
/// when the value is dropped, whichever comes first.
///
/// Moving the value moves the obligation to run the callback.
pub struct ScopedNotification {
    notification: Mutex<Option<Box<dyn FnOnce() + Send + 'static>>>,
}

impl ScopedNotification {
    /// Wrap a callback.
    pub fn new<F>(notification: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            notification: Mutex::new(Some(Box::new(notification))),
        }
    }

    /// Run the callback now if it has not run yet.
    pub fn notify(&self) {
        // take first so the callback never runs under our own lock
        let notification = self.notification.lock().take();
        if let Some(notification) = notification {
            notification();
        }
    }

    /// Whether the callback has already run.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.notification.lock().is_none()
    }
}

impl Drop for ScopedNotification {
    fn drop(&mut self) {
        if let Some(notification) = self.notification.get_mut().take() {
            notification();
        }
    }
}

impl fmt::Debug for ScopedNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedNotification")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Anything the pool can be asked to handle.
#[derive(Debug, Default)]
pub enum TaskVariant {
    /// Nothing to do.
    #[default]
    Empty,
    /// Run as soon as a worker is free.
    Simple(SimpleTask),
    /// Run once its wake time passes.
    Sleepy(SleepyTask),
    /// Release a notification.
    Notification(ScopedNotification),
}

impl TaskVariant {
    /// Whether this is [`TaskVariant::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<()> for TaskVariant {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<SimpleTask> for TaskVariant {
    fn from(task: SimpleTask) -> Self {
        Self::Simple(task)
    }
}

impl From<SleepyTask> for TaskVariant {
    fn from(task: SleepyTask) -> Self {
        Self::Sleepy(task)
    }
}

impl From<ScopedNotification> for TaskVariant {
    fn from(notification: ScopedNotification) -> Self {
        Self::Notification(notification)
    }
}

impl From<Option<TaskVariant>> for TaskVariant {
    fn from(task: Option<TaskVariant>) -> Self {
        task.unwrap_or_default()
    }
}

fn box_body<F, R>(body: F) -> TaskBody
where
    F: FnOnce() -> R + Send + 'static,
    R: Into<TaskVariant>,
{
    Box::new(move || body().into())
}

/// Build a [`SimpleTask`]. The body may return `()` or any continuation.
pub fn make_simple_task<F, R>(priority: TaskPriority, body: F) -> SimpleTask
where
    F: FnOnce() -> R + Send + 'static,
    R: Into<TaskVariant>,
{
    SimpleTask {
        priority,
        task: box_body(body),
    }
}

/// Build a [`SleepyTask`] that wakes `delay` after submission.
pub fn make_sleepy_task<F, R>(priority: TaskPriority, delay: Duration, body: F) -> SleepyTask
where
    F: FnOnce() -> R + Send + 'static,
    R: Into<TaskVariant>,
{
    SleepyTask {
        simple_task: make_simple_task(priority, body),
        wake_time: WakeTime::after(delay),
    }
}

/// Build a [`SleepyTask`] with an explicit wake time.
pub fn make_sleepy_task_at<F, R>(priority: TaskPriority, wake_time: WakeTime, body: F) -> SleepyTask
where
    F: FnOnce() -> R + Send + 'static,
    R: Into<TaskVariant>,
{
    SleepyTask {
        simple_task: make_simple_task(priority, body),
        wake_time,
    }
}

/// Outcome of running one task body.
#[derive(Debug)]
pub(crate) enum TaskOutcome {
    /// The body returned, possibly with a continuation.
    Completed(TaskVariant),
    /// The body panicked; there is no continuation.
    Panicked,
}

impl TaskOutcome {
    pub(crate) fn into_continuation(self) -> TaskVariant {
        match self {
            Self::Completed(continuation) => continuation,
            Self::Panicked => TaskVariant::Empty,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Run a task body, containing any panic so it cannot take down a worker.
pub(crate) fn execute_task(task: SimpleTask) -> TaskOutcome {
    let priority = task.priority;
    match catch_unwind(AssertUnwindSafe(task.task)) {
        Ok(continuation) => TaskOutcome::Completed(continuation),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(priority, panic = %message, "Task panicked; dropping its continuation");
            TaskOutcome::Panicked
        }
    }
}

/// Fire a notification with the same panic containment as [`execute_task`].
///
/// Returns `false` if the callback panicked.
pub(crate) fn fire_notification(notification: ScopedNotification) -> bool {
    match catch_unwind(AssertUnwindSafe(|| notification.notify())) {
        Ok(()) => true,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(panic = %message, "Notification panicked");
            false
        }
    }
}
