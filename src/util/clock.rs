//! Monotonic clock helpers.
//!
//! All scheduling decisions use [`Instant`]; wall-clock time never enters the
//! scheduler.

use std::time::{Duration, Instant};

/// Roughly thirty years; used as "never" when an addition would overflow.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Current monotonic instant.
#[inline]
#[must_use]
pub fn now() -> Instant {
    Instant::now()
}

/// `start + duration`, saturating to a far-future instant instead of panicking.
#[must_use]
pub fn saturating_instant_after(start: Instant, duration: Duration) -> Instant {
    start
        .checked_add(duration)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Deadline `duration` from now.
#[must_use]
pub fn deadline_after(duration: Duration) -> Instant {
    saturating_instant_after(now(), duration)
}
