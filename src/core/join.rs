//! Join signal / token / condition: the handshake that lets the owning thread
//! wait on work it handed to the pool while helping run that work.
//!
//! ```rust,ignore
//! let signal = make_join_signal();
//! let token = pool.get_join_token(&signal);
//! for chunk in chunks {
//!     let token = token.clone();
//!     pool.submit(make_simple_task(0, move || {
//!         process(chunk);
//!         drop(token);
//!     }).into());
//! }
//! let join_condition = pool.get_join_condition(token, &signal);
//! pool.work_while_waiting(&join_condition, 0);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::task::ScopedNotification;

/// Shared flag set when every copy of a [`JoinToken`] has been released.
pub type JoinSignal = Arc<AtomicBool>;

/// Create an unset join signal.
#[must_use]
pub fn make_join_signal() -> JoinSignal {
    Arc::new(AtomicBool::new(false))
}

/// Whether a join signal has been set.
#[must_use]
pub fn join_signal_is_set(signal: &JoinSignal) -> bool {
    signal.load(Ordering::Acquire)
}

/// Cloneable join token. The notification fires when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct JoinToken {
    notification: Arc<ScopedNotification>,
}

impl JoinToken {
    pub(crate) fn new(notification: ScopedNotification) -> Self {
        Self {
            notification: Arc::new(notification),
        }
    }

    /// Give up this copy of the token.
    pub fn release(self) {
        drop(self);
    }

    /// Number of live copies of this token.
    #[must_use]
    pub fn copies(&self) -> usize {
        Arc::strong_count(&self.notification)
    }
}
