//! C6: Job Dispatcher.
//!
//! Enqueues onto the queue named by C7's routing, deduplicating
//! `(task_type, task_id)` within a 60s window via `SET NX EX` (the same
//! atomic-reservation shape `RedisClient::blacklist_token` uses in the
//! retrieved pack's auth module, here used for dedup instead of denylist).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::redis_client::RedisClient;
use crate::worker_config::WorkerConfigStore;

/// §5: explicit enqueue timeout.
pub const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);
/// §3/§4.6: dedup window for `(task_type, task_id)`.
pub const DEDUPE_WINDOW: Duration = Duration::from_secs(60);
/// §4.6: completion-record retention.
pub const RETENTION: Duration = Duration::from_secs(600);

/// §3 JobPayload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub task_id: String,
    pub task_type: String,
    pub data: serde_json::Value,
}

/// The job record actually pushed onto a queue list, carrying enough
/// metadata for the worker runtime to report failures with context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub task_id: String,
    pub task_type: String,
    pub data: serde_json::Value,
    pub enqueued_at: i64,
}

pub struct JobDispatcher {
    redis: RedisClient,
    worker_config: Arc<WorkerConfigStore>,
}

impl JobDispatcher {
    pub fn new(redis: RedisClient, worker_config: Arc<WorkerConfigStore>) -> Self {
        Self {
            redis,
            worker_config,
        }
    }

    /// C6 `dispatch`: serialize, route, enqueue with dedup. Duplicate
    /// enqueues within the window are logged at `warn` and treated as
    /// success, per §4.6/§7.
    pub async fn dispatch(&self, payload: JobPayload, now: i64) -> DispatchResult<()> {
        let queue = self.worker_config.queue_for_task(&payload.task_type);

        let dedupe_key = format!(
            "insight-collector:dedupe:{}:{}",
            payload.task_type, payload.task_id
        );

        let reserved = tokio::time::timeout(
            ENQUEUE_TIMEOUT,
            self.redis
                .set_nx_ex(&dedupe_key, "1", DEDUPE_WINDOW),
        )
        .await
        .map_err(|_| DispatchError::Timeout(ENQUEUE_TIMEOUT))??;

        if !reserved {
            warn!(
                task_id = %payload.task_id,
                task_type = %payload.task_type,
                "duplicate enqueue within dedup window, treated as no-op success"
            );
            return Ok(());
        }

        let job = QueuedJob {
            task_id: payload.task_id.clone(),
            task_type: payload.task_type.clone(),
            data: payload.data,
            enqueued_at: now,
        };

        let queue_key = format!("insight-collector:queue:{queue}");
        tokio::time::timeout(ENQUEUE_TIMEOUT, self.redis.rpush_json(&queue_key, &job))
            .await
            .map_err(|_| DispatchError::Timeout(ENQUEUE_TIMEOUT))??;

        let record_key = format!("insight-collector:completed:{}:{}", job.task_type, job.task_id);
        // Retention record is best-effort bookkeeping; an error here
        // would surface on the next access, not block the enqueue.
        let _ = self.redis.set_json(&record_key, &job.enqueued_at, Some(RETENTION)).await;

        info!(task_id = %job.task_id, task_type = %job.task_type, queue = %queue, "job enqueued");
        Ok(())
    }
}
