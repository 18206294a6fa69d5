//! ic-queue: error types for C6-C8.

use thiserror::Error;

pub type DispatchResult<T> = Result<T, DispatchError>;

/// C6 failures. Duplicate/id-conflict outcomes never reach the caller as
/// an error — the dispatcher normalizes them to a logged no-op success
/// per §4.6; this enum only carries failures that really do surface.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to serialize job payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("enqueue timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type WorkerConfigResult<T> = Result<T, WorkerConfigError>;

/// C7 failures.
#[derive(Debug, Error)]
pub enum WorkerConfigError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to (de)serialize worker config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unknown worker queue: {0}")]
    UnknownQueue(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// C8 failures. Only client/backend initialization is fatal per §7.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to initialize queue backend: {0}")]
    BackendInit(#[from] redis::RedisError),
    #[error(transparent)]
    WorkerConfig(#[from] WorkerConfigError),
}
