//! Bounded FIFO behind a single lock.
//!
//! The `try_*` operations never block: a contended lock is reported as
//! [`TryPushError::TryLockFail`] / [`TryPopError::TryLockFail`] so the caller
//! can move on to another queue. `force_push` is the blocking fallback that
//! always succeeds.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;

/// Why a non-blocking push did not happen. The rejected value is handed back.
#[derive(Error)]
pub enum TryPushError<T> {
    /// The queue is at capacity.
    #[error("queue full")]
    QueueFull(T),
    /// Another thread holds the queue lock.
    #[error("queue lock contended")]
    TryLockFail(T),
}

impl<T> TryPushError<T> {
    /// Recover the value that was not pushed.
    pub fn into_inner(self) -> T {
        match self {
            Self::QueueFull(value) | Self::TryLockFail(value) => value,
        }
    }
}

impl<T> fmt::Debug for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull(_) => f.write_str("QueueFull(..)"),
            Self::TryLockFail(_) => f.write_str("TryLockFail(..)"),
        }
    }
}

/// Why a non-blocking pop returned nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryPopError {
    /// The queue holds no elements.
    #[error("queue empty")]
    QueueEmpty,
    /// Another thread holds the queue lock.
    #[error("queue lock contended")]
    TryLockFail,
}

/// Bounded lock-guarded FIFO.
pub struct TokenQueue<T> {
    queue: Mutex<VecDeque<T>>,
    max_queue_size: usize,
}

impl<T> TokenQueue<T> {
    /// Create an empty queue that `try_push` keeps at or below `max_queue_size`.
    #[must_use]
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(max_queue_size.min(1024))),
            max_queue_size,
        }
    }

    /// Append without blocking.
    ///
    /// # Errors
    ///
    /// Returns the value back inside [`TryPushError`] if the lock is contended
    /// or the queue is at capacity.
    pub fn try_push(&self, value: T) -> Result<(), TryPushError<T>> {
        let Some(mut queue) = self.queue.try_lock() else {
            return Err(TryPushError::TryLockFail(value));
        };
        if queue.len() >= self.max_queue_size {
            return Err(TryPushError::QueueFull(value));
        }
        queue.push_back(value);
        Ok(())
    }

    /// Append, waiting for the lock and ignoring capacity.
    pub fn force_push(&self, value: T) {
        self.queue.lock().push_back(value);
    }

    /// Push to the back and pop the front in one critical section.
    ///
    /// If the queue was empty the input comes straight back out.
    pub fn force_push_pop(&self, value: T) -> T {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            return value;
        }
        queue.push_back(value);
        // non-empty before the push, so the front exists
        queue.pop_front().unwrap_or_else(|| unreachable!("queue cannot be empty after push"))
    }

    /// Pop the front element without blocking.
    ///
    /// # Errors
    ///
    /// [`TryPopError::TryLockFail`] if the lock is contended,
    /// [`TryPopError::QueueEmpty`] if there is nothing to pop.
    pub fn try_pop(&self) -> Result<T, TryPopError> {
        let Some(mut queue) = self.queue.try_lock() else {
            return Err(TryPopError::TryLockFail);
        };
        queue.pop_front().ok_or(TryPopError::QueueEmpty)
    }

    /// Number of queued elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Capacity enforced by `try_push`.
    #[must_use]
    pub const fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = TokenQueue::new(10);
        for i in 0..5 {
            queue.try_push(i).unwrap();
        }
        for i in 0..5 {
            assert_eq!(queue.try_pop().unwrap(), i);
        }
        assert_eq!(queue.try_pop(), Err(TryPopError::QueueEmpty));
    }

    #[test]
    fn test_try_push_full_returns_value() {
        let queue = TokenQueue::new(2);
        queue.try_push("a").unwrap();
        queue.try_push("b").unwrap();

        let err = queue.try_push("c").unwrap_err();
        assert!(matches!(err, TryPushError::QueueFull(_)));
        assert_eq!(err.to_string(), "queue full");
        assert_eq!(err.into_inner(), "c");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_try_push_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(TryPushError::TryLockFail(5_u8));
        assert_eq!(err.to_string(), "queue lock contended");
    }

    #[test]
    fn test_force_push_ignores_capacity() {
        let queue = TokenQueue::new(1);
        queue.try_push(1).unwrap();
        queue.force_push(2);
        queue.force_push(3);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_pop().unwrap(), 1);
    }

    #[test]
    fn test_try_ops_fail_when_locked() {
        let queue = TokenQueue::new(4);
        queue.force_push(7);

        let guard = queue.queue.lock();
        assert_eq!(queue.try_pop(), Err(TryPopError::TryLockFail));
        assert!(matches!(queue.try_push(8), Err(TryPushError::TryLockFail(8))));
        drop(guard);

        assert_eq!(queue.try_pop(), Ok(7));
    }

    #[test]
    fn test_force_push_pop() {
        let queue = TokenQueue::new(4);
        // empty: value passes straight through
        assert_eq!(queue.force_push_pop(1), 1);
        assert!(queue.is_empty());

        queue.force_push(2);
        queue.force_push(3);
        assert_eq!(queue.force_push_pop(4), 2);
        assert_eq!(queue.try_pop(), Ok(3));
        assert_eq!(queue.try_pop(), Ok(4));
    }

    #[test]
    fn test_concurrent_pops_deliver_exactly_once() {
        const ITEMS: usize = 10_000;
        const THREADS: usize = 8;

        let queue = Arc::new(TokenQueue::new(ITEMS));
        for i in 0..ITEMS {
            queue.try_push(i).unwrap();
        }

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut popped = Vec::new();
                    loop {
                        match queue.try_pop() {
                            Ok(item) => popped.push(item),
                            Err(TryPopError::TryLockFail) => thread::yield_now(),
                            Err(TryPopError::QueueEmpty) => break,
                        }
                    }
                    popped
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for item in handle.join().unwrap() {
                assert!(seen.insert(item), "item {item} delivered twice");
            }
        }
        assert_eq!(seen.len(), ITEMS);
    }
}
