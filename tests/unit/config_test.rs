//! Tests for configuration validation

use prometheus_thread_pool::config::pool::{
    DEFAULT_MAX_PRIORITY_LEVEL, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_WAIT_DURATION_MS,
    DEFAULT_NUM_SUBMIT_CYCLE_ATTEMPTS,
};
use prometheus_thread_pool::config::{SchedulerConfig, ThreadPoolConfig};
use std::time::Duration;

#[test]
fn test_thread_pool_config_defaults() {
    let config = ThreadPoolConfig::default();
    assert_eq!(config.max_priority_level, DEFAULT_MAX_PRIORITY_LEVEL);
    assert_eq!(config.num_managed_workers, num_cpus::get().saturating_sub(1));
    assert_eq!(config.num_submit_cycle_attempts, DEFAULT_NUM_SUBMIT_CYCLE_ATTEMPTS);
    assert_eq!(config.max_wait_duration_ms, DEFAULT_MAX_WAIT_DURATION_MS);
    assert_eq!(config.max_queue_size, DEFAULT_MAX_QUEUE_SIZE);
    assert_eq!(config.thread_name_prefix, "tp-worker");
    assert_eq!(config.thread_stack_size, None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_thread_pool_config_builders() {
    let config = ThreadPoolConfig::new()
        .with_max_priority_level(7)
        .with_num_managed_workers(3)
        .with_num_submit_cycle_attempts(5)
        .with_max_wait_duration(Duration::from_millis(40))
        .with_max_queue_size(16)
        .with_thread_stack_size(256 * 1024);

    assert_eq!(config.max_priority_level, 7);
    assert_eq!(config.num_managed_workers, 3);
    assert_eq!(config.num_submit_cycle_attempts, 5);
    assert_eq!(config.max_wait_duration(), Duration::from_millis(40));
    assert_eq!(config.max_queue_size, 16);
    assert_eq!(config.thread_stack_size, Some(256 * 1024));
}

#[test]
fn test_thread_pool_config_invalid_values() {
    assert!(ThreadPoolConfig::new().with_num_submit_cycle_attempts(0).validate().is_err());
    assert!(ThreadPoolConfig::new().with_max_wait_duration(Duration::ZERO).validate().is_err());
    assert!(ThreadPoolConfig::new().with_max_queue_size(0).validate().is_err());
    assert!(ThreadPoolConfig::new().with_thread_stack_size(0).validate().is_err());
}

#[test]
fn test_thread_pool_config_from_json_fills_defaults() {
    let config = ThreadPoolConfig::from_json_str(r#"{ "num_managed_workers": 2 }"#).unwrap();
    assert_eq!(config.num_managed_workers, 2);
    assert_eq!(config.max_priority_level, DEFAULT_MAX_PRIORITY_LEVEL);

    assert!(ThreadPoolConfig::from_json_str(r#"{ "max_wait_duration_ms": 0 }"#).is_err());
    assert!(ThreadPoolConfig::from_json_str("[]").is_err());
}

#[test]
fn test_thread_pool_config_serde_round_trip() {
    let config = ThreadPoolConfig::new().with_num_managed_workers(1).with_thread_name_prefix("rt");
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(ThreadPoolConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_scheduler_config_requires_pools() {
    assert!(SchedulerConfig::default().validate().is_err());
    assert!(SchedulerConfig::from_json_str(r#"{ "pools": { "main": {} } }"#).is_ok());
}
