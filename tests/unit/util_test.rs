//! Tests for utility functions

use prometheus_thread_pool::util::{deadline_after, init_tracing, now, saturating_instant_after};
use std::time::Duration;

#[test]
fn test_deadline_after_is_in_the_future() {
    let before = now();
    let deadline = deadline_after(Duration::from_millis(10));
    assert!(deadline >= before + Duration::from_millis(10));
}

#[test]
fn test_saturating_instant_after_never_overflows() {
    let start = now();
    let far = saturating_instant_after(start, Duration::MAX);
    assert!(far > start);
}

#[test]
fn test_init_tracing_can_be_called_repeatedly() {
    init_tracing();
    init_tracing();
}
