//! Builders to construct thread pools from configuration.

use std::collections::HashMap;

use tracing::info;

use crate::config::{SchedulerConfig, ThreadPoolConfig};
use crate::core::{SchedulerError, ThreadPool};

/// Build a single thread pool, owned by the calling thread.
///
/// # Errors
///
/// Propagates validation and worker spawn failures.
pub fn build_thread_pool(cfg: &ThreadPoolConfig) -> Result<ThreadPool, SchedulerError> {
    ThreadPool::from_config(cfg)
}

/// Build every named pool in the scheduler configuration.
///
/// All pools are owned by the calling thread. If any pool fails to build,
/// the ones already built are torn down before the error is returned.
///
/// # Errors
///
/// `SchedulerError::InvalidConfig` if the configuration is invalid,
/// otherwise the first pool construction failure.
pub fn build_thread_pools(cfg: &SchedulerConfig) -> Result<HashMap<String, ThreadPool>, SchedulerError> {
    cfg.validate()
        .map_err(|e| SchedulerError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let pool = build_thread_pool(pool_cfg)?;
        info!(pool = %name, pool_id = %pool.pool_id(), "Built thread pool");
        pools.insert(name.clone(), pool);
    }

    Ok(pools)
}

/// Parse a JSON scheduler configuration and build every pool in it.
///
/// # Errors
///
/// `SchedulerError::ConfigParse` if the input is not a valid configuration,
/// otherwise as [`build_thread_pools`].
pub fn build_thread_pools_from_json(input: &str) -> Result<HashMap<String, ThreadPool>, SchedulerError> {
    let cfg = SchedulerConfig::from_json_str(input).map_err(SchedulerError::ConfigParse)?;
    build_thread_pools(&cfg)
}
