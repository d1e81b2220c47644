//! # Prometheus Thread Pool
//!
//! A priority thread pool for CPU-bound work, with delayed tasks and
//! cooperative joins.
//!
//! Tasks are plain closures tagged with a priority level (`0` is the most
//! urgent). A task may return a continuation, which the pool submits for it,
//! so multi-step work never blocks a worker between steps.
//!
//! ## Key Features
//!
//! - **Priority levels**: one bounded FIFO per (priority, worker slot) pair
//! - **Contention tolerance**: submission probes queues with `try_lock` and
//!   falls back to a forced push instead of failing
//! - **Delayed tasks**: sleepy tasks become runnable at a wake instant,
//!   without holding a worker hostage while they sleep
//! - **Cooperative joins**: the owning thread runs pool tasks while it waits
//!   for the work it submitted
//! - **Draining shutdown**: dropping the pool joins workers and runs
//!   whatever is still queued
//!
//! ## Usage
//!
//! ```rust,ignore
//! use prometheus_thread_pool::core::{
//!     make_join_signal, make_simple_task, make_sleepy_task, ThreadPool,
//! };
//! use std::time::Duration;
//!
//! prometheus_thread_pool::util::init_tracing();
//!
//! let pool = ThreadPool::new(2, 4, 20, Duration::from_millis(500))?;
//!
//! // Fire and forget, with a continuation at a lower priority.
//! pool.submit(make_simple_task(0, || {
//!     parse_header();
//!     make_simple_task(2, || index_body())
//! }).into());
//!
//! // Runs no earlier than 50ms from now.
//! pool.submit(make_sleepy_task(1, Duration::from_millis(50), flush_cache).into());
//!
//! // Join on a batch while helping to run it.
//! let signal = make_join_signal();
//! let token = pool.get_join_token(&signal);
//! for shard in shards {
//!     let token = token.clone();
//!     pool.submit(make_simple_task(1, move || {
//!         scan(shard);
//!         drop(token);
//!     }).into());
//! }
//! let join_condition = pool.get_join_condition(token, &signal);
//! pool.work_while_waiting(&join_condition, 0);
//! ```
//!
//! Pools can also be built from configuration:
//!
//! ```rust,ignore
//! use prometheus_thread_pool::builders::build_thread_pool;
//! use prometheus_thread_pool::config::ThreadPoolConfig;
//!
//! let pool = build_thread_pool(&ThreadPoolConfig::from_env()?)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling primitives: queues, waiting, tasks, and the thread pool.
pub mod core;
/// Configuration models for thread pools.
pub mod config;
/// Builders to construct thread pools from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;

pub use crate::core::{
    make_join_signal, make_simple_task, make_sleepy_task, make_sleepy_task_at, SchedulerError,
    TaskVariant, ThreadPool, WaitOutcome,
};
