//! Tests for error types

use prometheus_thread_pool::core::{SchedulerError, TryPopError, TryPushError};

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("max_queue_size must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: max_queue_size must be greater than 0"
    );
}

#[test]
fn test_worker_spawn_error() {
    let err = SchedulerError::WorkerSpawn("out of threads".to_string());
    assert_eq!(format!("{err}"), "failed to spawn worker thread: out of threads");
}

#[test]
fn test_config_parse_error() {
    let err = SchedulerError::ConfigParse("parse error: EOF".to_string());
    assert_eq!(format!("{err}"), "config parse error: parse error: EOF");
}

#[test]
fn test_queue_errors_are_std_errors() {
    fn assert_std_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}

    let push_err = TryPushError::QueueFull(7_u32);
    assert_std_error(&push_err);
    assert_eq!(push_err.into_inner(), 7);

    let pop_err = TryPopError::TryLockFail;
    assert_std_error(&pop_err);
    assert_ne!(pop_err, TryPopError::QueueEmpty);
}

#[test]
fn test_scheduler_error_converts_into_anyhow() {
    fn load() -> prometheus_thread_pool::core::AppResult<()> {
        Err::<(), _>(SchedulerError::InvalidConfig("nope".into()))?;
        Ok(())
    }
    let err = load().unwrap_err();
    assert!(err.downcast_ref::<SchedulerError>().is_some());
}
