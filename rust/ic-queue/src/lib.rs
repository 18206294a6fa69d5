//! Job dispatch, worker config store, worker runtime (C6-C8).

pub mod dispatcher;
pub mod error;
pub mod redis_client;
pub mod registry;
pub mod runtime;
pub mod worker_config;

pub use dispatcher::{JobDispatcher, JobPayload, QueuedJob};
pub use error::{DispatchError, RuntimeError, WorkerConfigError};
pub use redis_client::RedisClient;
pub use registry::{JobDefinition, JobRegistry};
pub use runtime::{JobHandler, RuntimeState, WorkerRuntime};
pub use worker_config::{WorkerConfig, WorkerConfigStore};
