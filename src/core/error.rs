//! Error types for thread pool construction and configuration.

use thiserror::Error;

/// Errors produced while building or configuring a thread pool.
///
/// Queue contention is not represented here: submission absorbs it by
/// retrying and then force-pushing.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A managed worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
    /// Configuration could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
