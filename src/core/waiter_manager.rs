//! Blocking and waking of pool worker slots.
//!
//! Three independent channels share one shutdown flag:
//!
//! - **normal**: workers with nothing to do
//! - **sleepy**: workers holding a reserved delayed task, waiting for its wake instant
//! - **conditional**: one slot per worker index, each waiting on a caller predicate
//!
//! [`WaiterManager::notify_one`] prefers normal waiters, then sleepy waiters,
//! then conditional waiters. A notification can still reach a worker that
//! finds no work; callers bound every wait so a lost wakeup only costs latency.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::util::clock::deadline_after;

/// Why a wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The pool is shutting down.
    ShuttingDown,
    /// The deadline passed.
    Timeout,
    /// Woken by a notification.
    DoneWaiting,
    /// The caller's condition holds.
    ConditionTriggered,
}

/// How a wait reacts to pool shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Wait anyway; the caller's own deadline still applies.
    Wait,
    /// Return [`WaitOutcome::ShuttingDown`] without waiting.
    ExitEarly,
}

#[derive(Debug, Default)]
struct WaitChannel {
    lock: Mutex<()>,
    condvar: Condvar,
    num_waiters: AtomicUsize,
}

impl WaitChannel {
    /// Block on the channel; the lock must already be held. Returns whether the wait timed out.
    fn block(&self, guard: &mut parking_lot::MutexGuard<'_, ()>, deadline: Option<Instant>) -> bool {
        self.num_waiters.fetch_add(1, Ordering::AcqRel);
        let timed_out = match deadline {
            Some(deadline) => self.condvar.wait_until(guard, deadline).timed_out(),
            None => {
                self.condvar.wait(guard);
                false
            }
        };
        self.num_waiters.fetch_sub(1, Ordering::AcqRel);
        timed_out
    }
}

/// Manages `num_managed_workers + 1` waiter slots and the shutdown flag.
#[derive(Debug)]
pub struct WaiterManager {
    normal: WaitChannel,
    sleepy: WaitChannel,
    conditional: Vec<WaitChannel>,
    num_conditional_waiters: AtomicUsize,
    shutting_down: AtomicBool,
}

impl WaiterManager {
    /// Create a manager with one slot per managed worker plus one for the owner.
    #[must_use]
    pub fn new(num_managed_workers: usize) -> Self {
        Self {
            normal: WaitChannel::default(),
            sleepy: WaitChannel::default(),
            conditional: (0..=num_managed_workers)
                .map(|_| WaitChannel::default())
                .collect(),
            num_conditional_waiters: AtomicUsize::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Number of waiter slots.
    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.conditional.len()
    }

    fn slot(&self, waiter_index: usize) -> &WaitChannel {
        let last = self.conditional.len() - 1;
        &self.conditional[waiter_index.min(last)]
    }

    fn classify(&self, timed_out: bool) -> WaitOutcome {
        if self.is_shutting_down() {
            WaitOutcome::ShuttingDown
        } else if timed_out {
            WaitOutcome::Timeout
        } else {
            WaitOutcome::DoneWaiting
        }
    }

    fn wait_on(
        &self,
        channel: &WaitChannel,
        deadline: Option<Instant>,
        policy: ShutdownPolicy,
    ) -> WaitOutcome {
        let mut guard = channel.lock.lock();
        if policy == ShutdownPolicy::ExitEarly && self.is_shutting_down() {
            return WaitOutcome::ShuttingDown;
        }
        let timed_out = channel.block(&mut guard, deadline);
        drop(guard);
        self.classify(timed_out)
    }

    /// Wait on the normal channel until notified.
    pub fn wait(&self, _waiter_index: usize, policy: ShutdownPolicy) -> WaitOutcome {
        self.wait_on(&self.normal, None, policy)
    }

    /// Wait on the normal channel for at most `duration`.
    pub fn wait_for(&self, waiter_index: usize, duration: Duration, policy: ShutdownPolicy) -> WaitOutcome {
        self.wait_until(waiter_index, deadline_after(duration), policy)
    }

    /// Wait on the normal channel until `deadline`.
    pub fn wait_until(&self, _waiter_index: usize, deadline: Instant, policy: ShutdownPolicy) -> WaitOutcome {
        self.wait_on(&self.normal, Some(deadline), policy)
    }

    /// Wait on the sleepy channel until `wake_instant`.
    pub fn sleepy_wait_until(
        &self,
        _waiter_index: usize,
        wake_instant: Instant,
        policy: ShutdownPolicy,
    ) -> WaitOutcome {
        self.wait_on(&self.sleepy, Some(wake_instant), policy)
    }

    fn conditional_wait_impl<C>(
        &self,
        waiter_index: usize,
        condition: C,
        deadline: Option<Instant>,
        policy: ShutdownPolicy,
    ) -> WaitOutcome
    where
        C: Fn() -> bool,
    {
        let slot = self.slot(waiter_index);
        let mut guard = slot.lock.lock();

        // checked under the slot lock, so a notify_conditional_waiter side
        // effect lands either before this check or after we are parked
        if condition() {
            return WaitOutcome::ConditionTriggered;
        }
        if policy == ShutdownPolicy::ExitEarly && self.is_shutting_down() {
            return WaitOutcome::ShuttingDown;
        }

        self.num_conditional_waiters.fetch_add(1, Ordering::AcqRel);
        let timed_out = slot.block(&mut guard, deadline);
        self.num_conditional_waiters.fetch_sub(1, Ordering::AcqRel);

        if condition() {
            return WaitOutcome::ConditionTriggered;
        }
        drop(guard);
        self.classify(timed_out)
    }

    /// Wait on slot `waiter_index` until `condition` holds or a notification arrives.
    pub fn conditional_wait<C>(&self, waiter_index: usize, condition: C, policy: ShutdownPolicy) -> WaitOutcome
    where
        C: Fn() -> bool,
    {
        self.conditional_wait_impl(waiter_index, condition, None, policy)
    }

    /// Like [`conditional_wait`](Self::conditional_wait), bounded by `duration`.
    pub fn conditional_wait_for<C>(
        &self,
        waiter_index: usize,
        condition: C,
        duration: Duration,
        policy: ShutdownPolicy,
    ) -> WaitOutcome
    where
        C: Fn() -> bool,
    {
        self.conditional_wait_impl(waiter_index, condition, Some(deadline_after(duration)), policy)
    }

    /// Like [`conditional_wait`](Self::conditional_wait), bounded by `deadline`.
    pub fn conditional_wait_until<C>(
        &self,
        waiter_index: usize,
        condition: C,
        deadline: Instant,
        policy: ShutdownPolicy,
    ) -> WaitOutcome
    where
        C: Fn() -> bool,
    {
        self.conditional_wait_impl(waiter_index, condition, Some(deadline), policy)
    }

    /// Wake one waiter, preferring normal, then sleepy, then conditional.
    ///
    /// Returns whether a parked thread was woken.
    pub fn notify_one(&self) -> bool {
        if self.normal.condvar.notify_one() {
            return true;
        }
        if self.sleepy.condvar.notify_one() {
            return true;
        }
        if self.num_conditional_waiters.load(Ordering::Acquire) == 0 {
            return false;
        }
        self.conditional
            .iter()
            .filter(|slot| slot.num_waiters.load(Ordering::Acquire) > 0)
            .any(|slot| slot.condvar.notify_one())
    }

    /// Wake every waiter on every channel.
    pub fn notify_all(&self) {
        self.normal.condvar.notify_all();
        self.sleepy.condvar.notify_all();
        for slot in &self.conditional {
            slot.condvar.notify_all();
        }
    }

    /// Run `side_effect` under slot `waiter_index`'s lock, then wake that slot.
    pub fn notify_conditional_waiter<F>(&self, waiter_index: usize, side_effect: F)
    where
        F: FnOnce(),
    {
        let slot = self.slot(waiter_index);
        {
            let _guard = slot.lock.lock();
            side_effect();
        }
        slot.condvar.notify_all();
    }

    /// Set the shutdown flag and wake everyone. Idempotent.
    pub fn shut_down(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);

        // anyone between their shutdown check and their wait holds a channel
        // lock; cycling through the locks means they are parked before we notify
        drop(self.normal.lock.lock());
        drop(self.sleepy.lock.lock());
        for slot in &self.conditional {
            drop(slot.lock.lock());
        }

        self.notify_all();
    }

    /// Whether [`shut_down`](Self::shut_down) has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Threads parked on the normal channel.
    #[must_use]
    pub fn num_normal_waiters(&self) -> usize {
        self.normal.num_waiters.load(Ordering::Acquire)
    }

    /// Threads parked on the sleepy channel.
    #[must_use]
    pub fn num_sleepy_waiters(&self) -> usize {
        self.sleepy.num_waiters.load(Ordering::Acquire)
    }

    /// Threads parked on any conditional slot.
    #[must_use]
    pub fn num_conditional_waiters(&self) -> usize {
        self.num_conditional_waiters.load(Ordering::Acquire)
    }
}
