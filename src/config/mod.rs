//! Configuration models for thread pools.

pub mod pool;

pub use pool::{SchedulerConfig, ThreadPoolConfig};
