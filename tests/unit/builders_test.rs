//! Tests for builder modules

use prometheus_thread_pool::builders::{build_thread_pool, build_thread_pools};
use prometheus_thread_pool::config::{SchedulerConfig, ThreadPoolConfig};
use prometheus_thread_pool::core::SchedulerError;
use std::collections::HashMap;

#[test]
fn test_build_thread_pool_honors_config() {
    let config = ThreadPoolConfig::new()
        .with_max_priority_level(3)
        .with_num_managed_workers(2)
        .with_thread_name_prefix("builder-test");

    let pool = build_thread_pool(&config).unwrap();
    assert_eq!(pool.max_priority_level(), 3);
    assert_eq!(pool.num_managed_workers(), 2);
    assert_eq!(pool.stats().worker_count, 2);
}

#[test]
fn test_build_thread_pool_rejects_invalid_config() {
    let config = ThreadPoolConfig::new().with_num_submit_cycle_attempts(0);
    let err = build_thread_pool(&config).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_build_thread_pools_names_invalid_pool() {
    let mut pools = HashMap::new();
    pools.insert("ok".to_string(), ThreadPoolConfig::new().with_num_managed_workers(0));
    pools.insert("broken".to_string(), ThreadPoolConfig::new().with_max_queue_size(0));

    match build_thread_pools(&SchedulerConfig { pools }) {
        Err(SchedulerError::InvalidConfig(message)) => assert!(message.contains("broken")),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}
