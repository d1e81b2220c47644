//! Builders to construct thread pools from configuration.

pub mod pool_builder;

pub use pool_builder::{build_thread_pool, build_thread_pools, build_thread_pools_from_json};
