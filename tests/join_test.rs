//! Integration tests for the join token / join condition handshake.

use prometheus_thread_pool::core::{
    join_signal_is_set, make_join_signal, make_simple_task, make_sleepy_task, ThreadPool,
    WaitOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn submit_counted_batch(pool: &ThreadPool, count: usize) -> (Arc<AtomicUsize>, impl Fn() -> bool) {
    let executed = Arc::new(AtomicUsize::new(0));
    let signal = make_join_signal();
    let token = pool.get_join_token(&signal);

    for i in 0..count {
        let token = token.clone();
        let executed = Arc::clone(&executed);
        pool.submit(
            make_simple_task((i % 3) as u8, move || {
                executed.fetch_add(1, Ordering::SeqCst);
                drop(token);
            })
            .into(),
        );
    }

    (executed, pool.get_join_condition(token, &signal))
}

#[test]
fn test_join_five_tasks_on_workers() {
    let pool = ThreadPool::new(2, 2, 20, Duration::from_millis(50)).unwrap();
    let (executed, join_condition) = submit_counted_batch(&pool, 5);

    assert_eq!(
        pool.work_while_waiting(&join_condition, 0),
        WaitOutcome::ConditionTriggered
    );
    assert_eq!(executed.load(Ordering::SeqCst), 5);
}

#[test]
fn test_join_five_tasks_on_owner_only() {
    let pool = ThreadPool::new(2, 0, 20, Duration::from_millis(50)).unwrap();
    let (executed, join_condition) = submit_counted_batch(&pool, 5);

    assert!(!join_condition());
    pool.work_while_waiting(&join_condition, 0);
    assert_eq!(executed.load(Ordering::SeqCst), 5);
}

#[test]
fn test_join_condition_immediately_true_when_batch_already_done() {
    let pool = ThreadPool::new(0, 0, 20, Duration::from_millis(50)).unwrap();
    let signal = make_join_signal();
    let token = pool.get_join_token(&signal);

    let held = token.clone();
    pool.submit(make_simple_task(0, move || drop(held)).into());
    assert!(pool.try_run_next_task(0));

    let join_condition = pool.get_join_condition(token, &signal);
    assert!(join_condition());
    assert!(join_signal_is_set(&signal));
}

#[test]
fn test_join_over_sleepy_tasks() {
    let pool = ThreadPool::new(1, 1, 20, Duration::from_millis(50)).unwrap();
    let executed = Arc::new(AtomicUsize::new(0));
    let signal = make_join_signal();
    let token = pool.get_join_token(&signal);

    for delay_ms in [5_u64, 15, 25] {
        let token = token.clone();
        let executed = Arc::clone(&executed);
        pool.submit(
            make_sleepy_task(1, Duration::from_millis(delay_ms), move || {
                executed.fetch_add(1, Ordering::SeqCst);
                drop(token);
            })
            .into(),
        );
    }

    let join_condition = pool.get_join_condition(token, &signal);
    pool.work_while_waiting(&join_condition, 0);
    assert_eq!(executed.load(Ordering::SeqCst), 3);
}

#[test]
fn test_nested_join_from_continuation() {
    let pool = ThreadPool::new(1, 2, 20, Duration::from_millis(50)).unwrap();
    let executed = Arc::new(AtomicUsize::new(0));
    let signal = make_join_signal();
    let token = pool.get_join_token(&signal);

    // each task hands its token copy on to its continuation
    for _ in 0..4 {
        let token = token.clone();
        let executed = Arc::clone(&executed);
        pool.submit(
            make_simple_task(0, move || {
                executed.fetch_add(1, Ordering::SeqCst);
                make_simple_task(1, move || {
                    executed.fetch_add(1, Ordering::SeqCst);
                    drop(token);
                })
            })
            .into(),
        );
    }

    let join_condition = pool.get_join_condition(token, &signal);
    pool.work_while_waiting(&join_condition, 0);
    assert_eq!(executed.load(Ordering::SeqCst), 8);
}
