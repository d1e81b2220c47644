//! Thread pool and scheduler configuration structures.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::error::AppResult;
use crate::core::task::TaskPriority;

/// Default number of priority levels above 0.
pub const DEFAULT_MAX_PRIORITY_LEVEL: TaskPriority = 4;
/// Default probe budget multiplier for submission.
pub const DEFAULT_NUM_SUBMIT_CYCLE_ATTEMPTS: usize = 20;
/// Default idle re-poll interval.
pub const DEFAULT_MAX_WAIT_DURATION_MS: u64 = 500;
/// Default capacity of each per-priority queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

fn default_num_managed_workers() -> usize {
    num_cpus::get().saturating_sub(1)
}

fn default_thread_name_prefix() -> String {
    "tp-worker".into()
}

/// Thread pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadPoolConfig {
    /// Least urgent priority level; tasks are clamped into `0..=max_priority_level`.
    pub max_priority_level: TaskPriority,
    /// Spawned worker threads. The owning thread is an extra slot on top.
    pub num_managed_workers: usize,
    /// Round-robin passes over all queues before a submission force-pushes.
    pub num_submit_cycle_attempts: usize,
    /// Longest an idle worker sleeps before re-polling, in milliseconds.
    pub max_wait_duration_ms: u64,
    /// Capacity of each per-priority queue for non-forced pushes.
    pub max_queue_size: usize,
    /// Worker thread name prefix; the worker index is appended.
    pub thread_name_prefix: String,
    /// Worker stack size in bytes. `None` keeps the platform default.
    pub thread_stack_size: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            max_priority_level: DEFAULT_MAX_PRIORITY_LEVEL,
            num_managed_workers: default_num_managed_workers(),
            num_submit_cycle_attempts: DEFAULT_NUM_SUBMIT_CYCLE_ATTEMPTS,
            max_wait_duration_ms: DEFAULT_MAX_WAIT_DURATION_MS,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            thread_name_prefix: default_thread_name_prefix(),
            thread_stack_size: None,
        }
    }
}

impl ThreadPoolConfig {
    /// Configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the least urgent priority level.
    #[must_use]
    pub const fn with_max_priority_level(mut self, max_priority_level: TaskPriority) -> Self {
        self.max_priority_level = max_priority_level;
        self
    }

    /// Set the number of spawned workers.
    #[must_use]
    pub const fn with_num_managed_workers(mut self, num_managed_workers: usize) -> Self {
        self.num_managed_workers = num_managed_workers;
        self
    }

    /// Set the submission probe budget.
    #[must_use]
    pub const fn with_num_submit_cycle_attempts(mut self, attempts: usize) -> Self {
        self.num_submit_cycle_attempts = attempts;
        self
    }

    /// Set the idle re-poll interval, rounded up to whole milliseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_max_wait_duration(mut self, max_wait_duration: Duration) -> Self {
        let has_remainder = max_wait_duration.subsec_nanos() % 1_000_000 != 0;
        let millis = max_wait_duration.as_millis() + has_remainder as u128;
        self.max_wait_duration_ms = if millis > u64::MAX as u128 {
            u64::MAX
        } else {
            millis as u64
        };
        self
    }

    /// Set the per-queue capacity.
    #[must_use]
    pub const fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, stack_size: usize) -> Self {
        self.thread_stack_size = Some(stack_size);
        self
    }

    /// Idle re-poll interval as a [`Duration`].
    #[must_use]
    pub const fn max_wait_duration(&self) -> Duration {
        Duration::from_millis(self.max_wait_duration_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_submit_cycle_attempts == 0 {
            return Err("num_submit_cycle_attempts must be greater than 0".into());
        }
        if self.max_wait_duration_ms == 0 {
            return Err("max_wait_duration_ms must be greater than 0".into());
        }
        if self.max_queue_size == 0 {
            return Err("max_queue_size must be greater than 0".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a pool configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a configuration from `THREAD_POOL_*` environment variables,
    /// loading a `.env` file first if one exists. Unset variables keep defaults.
    ///
    /// Recognized variables: `THREAD_POOL_MAX_PRIORITY_LEVEL`,
    /// `THREAD_POOL_NUM_MANAGED_WORKERS`, `THREAD_POOL_NUM_SUBMIT_CYCLE_ATTEMPTS`,
    /// `THREAD_POOL_MAX_WAIT_DURATION_MS`, `THREAD_POOL_MAX_QUEUE_SIZE`,
    /// `THREAD_POOL_THREAD_NAME_PREFIX`, `THREAD_POOL_THREAD_STACK_SIZE`.
    ///
    /// # Errors
    ///
    /// Fails if a variable is present but unparsable, or the result is invalid.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<L>(lookup: L) -> AppResult<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<T>>
        where
            T: std::str::FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            lookup(key)
                .map(|raw| raw.trim().parse::<T>().with_context(|| format!("invalid value for {key}: {raw:?}")))
                .transpose()
        }

        let mut cfg = Self::default();
        if let Some(v) = parse(&lookup, "THREAD_POOL_MAX_PRIORITY_LEVEL")? {
            cfg.max_priority_level = v;
        }
        if let Some(v) = parse(&lookup, "THREAD_POOL_NUM_MANAGED_WORKERS")? {
            cfg.num_managed_workers = v;
        }
        if let Some(v) = parse(&lookup, "THREAD_POOL_NUM_SUBMIT_CYCLE_ATTEMPTS")? {
            cfg.num_submit_cycle_attempts = v;
        }
        if let Some(v) = parse(&lookup, "THREAD_POOL_MAX_WAIT_DURATION_MS")? {
            cfg.max_wait_duration_ms = v;
        }
        if let Some(v) = parse(&lookup, "THREAD_POOL_MAX_QUEUE_SIZE")? {
            cfg.max_queue_size = v;
        }
        if let Some(prefix) = lookup("THREAD_POOL_THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = prefix;
        }
        if let Some(v) = parse(&lookup, "THREAD_POOL_THREAD_STACK_SIZE")? {
            cfg.thread_stack_size = Some(v);
        }

        cfg.validate().map_err(anyhow::Error::msg).context("thread pool config from environment")?;
        Ok(cfg)
    }
}

/// Root scheduler configuration: any number of named pools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, ThreadPoolConfig>,
}

impl SchedulerConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// Returns a description naming the first invalid pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
