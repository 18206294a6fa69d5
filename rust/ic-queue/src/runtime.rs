//! C8: Worker Runtime.
//!
//! Multiple worker tasks drain weighted queues concurrently; a heartbeat
//! task refreshes a TTL'd liveness key; shutdown is driven by `SIGINT`/
//! `SIGTERM` the same way `knhk-test-cache::daemon` waits on
//! `tokio::signal::unix::SignalKind::interrupt()` (falling back to
//! `ctrl_c` off-`unix`), extended here with the `SIGTERM` kind the spec
//! also requires and a bounded drain instead of an immediate exit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::dispatcher::QueuedJob;
use crate::error::RuntimeResult;
use crate::redis_client::RedisClient;
use crate::worker_config::WorkerConfigStore;

/// §4.8: heartbeat refresh cadence.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
/// §4.8: heartbeat key TTL.
pub const HEARTBEAT_TTL: Duration = Duration::from_secs(60);
/// §4.8: per-task shutdown grace.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

const IDLE_POLL: Duration = Duration::from_millis(200);

/// §4.8 state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Stopped,
    Running,
    Draining,
}

/// A handler for one task-type, registered from the job registry.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn task_type(&self) -> &str;
    async fn handle(&self, job: &QueuedJob) -> Result<(), String>;
}

pub struct WorkerRuntime {
    redis: RedisClient,
    worker_config: Arc<WorkerConfigStore>,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    concurrency: usize,
    instance_id: String,
    state: Mutex<RuntimeState>,
}

impl WorkerRuntime {
    pub fn new(
        redis: RedisClient,
        worker_config: Arc<WorkerConfigStore>,
        concurrency: usize,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            redis,
            worker_config,
            handlers: HashMap::new(),
            concurrency: concurrency.max(1),
            instance_id: instance_id.into(),
            state: Mutex::new(RuntimeState::Stopped),
        }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(handler.task_type().to_string(), handler);
    }

    pub fn state(&self) -> RuntimeState {
        *self.state.lock()
    }

    fn heartbeat_key(&self) -> String {
        format!("insight-collector:worker:heartbeat:{}", self.instance_id)
    }

    /// Runs until a shutdown signal is received, then drains in-flight
    /// jobs for up to `SHUTDOWN_GRACE` before returning.
    pub async fn run(self: Arc<Self>) -> RuntimeResult<()> {
        *self.state.lock() = RuntimeState::Running;
        info!(concurrency = self.concurrency, "worker runtime started");

        let stop_heartbeat = Arc::new(Notify::new());
        let heartbeat_task = tokio::spawn(self.clone().heartbeat_loop(stop_heartbeat.clone()));

        let draining = Arc::new(AtomicBool::new(false));
        let inflight = Arc::new(AtomicUsize::new(0));
        let mut worker_tasks = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            let rt = self.clone();
            let draining = draining.clone();
            let inflight = inflight.clone();
            worker_tasks.push(tokio::spawn(async move {
                rt.worker_loop(draining, inflight).await;
            }));
        }

        wait_for_shutdown_signal().await;
        info!("shutdown signal received, draining");
        *self.state.lock() = RuntimeState::Draining;
        draining.store(true, Ordering::SeqCst);

        let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
        while inflight.load(Ordering::SeqCst) > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if inflight.load(Ordering::SeqCst) > 0 {
            warn!("shutdown grace elapsed with jobs still in flight");
        }

        for task in worker_tasks {
            task.abort();
            let _ = task.await;
        }

        stop_heartbeat.notify_one();
        let _ = heartbeat_task.await;
        let _ = self.redis.del(&self.heartbeat_key()).await;

        *self.state.lock() = RuntimeState::Stopped;
        info!("worker runtime stopped");
        Ok(())
    }

    async fn heartbeat_loop(self: Arc<Self>, stop: Arc<Notify>) {
        let key = self.heartbeat_key();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    if let Err(e) = self.redis.set_json(&key, &true, Some(HEARTBEAT_TTL)).await {
                        warn!(error = %e, "failed to refresh heartbeat key");
                    }
                }
                _ = stop.notified() => break,
            }
        }
    }

    async fn worker_loop(self: Arc<Self>, draining: Arc<AtomicBool>, inflight: Arc<AtomicUsize>) {
        loop {
            if draining.load(Ordering::SeqCst) {
                return;
            }
            let weights = self.worker_config.queue_weights();
            let Some(queue) = pick_weighted_queue(&weights) else {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            };

            let key = format!("insight-collector:queue:{queue}");
            match self.redis.lpop_json::<QueuedJob>(&key).await {
                Ok(Some(job)) => {
                    inflight.fetch_add(1, Ordering::SeqCst);
                    self.run_job(&job).await;
                    inflight.fetch_sub(1, Ordering::SeqCst);
                }
                Ok(None) => tokio::time::sleep(IDLE_POLL).await,
                Err(e) => {
                    warn!(error = %e, "queue poll failed");
                    tokio::time::sleep(IDLE_POLL * 2).await;
                }
            }
        }
    }

    async fn run_job(&self, job: &QueuedJob) {
        match self.handlers.get(&job.task_type) {
            Some(handler) => {
                if let Err(e) = handler.handle(job).await {
                    error!(
                        task_id = %job.task_id,
                        task_type = %job.task_type,
                        error = %e,
                        "job handler failed; backend retry policy applies"
                    );
                }
            }
            None => warn!(task_type = %job.task_type, "no handler registered for task type"),
        }
    }
}

/// Weighted random pick among queues with weight > 0. Returns `None` when
/// there is nothing to pick from.
fn pick_weighted_queue(weights: &HashMap<String, u32>) -> Option<String> {
    let total: u32 = weights.values().sum();
    if total == 0 {
        return None;
    }
    let mut pick = rand::thread_rng().gen_range(0..total);
    let mut names: Vec<&String> = weights.keys().collect();
    names.sort();
    for name in names {
        let w = weights[name];
        if pick < w {
            return Some(name.clone());
        }
        pick -= w;
    }
    None
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_pick_is_none_when_all_zero() {
        let weights = HashMap::new();
        assert_eq!(pick_weighted_queue(&weights), None);
    }

    #[test]
    fn weighted_pick_picks_the_only_nonzero_queue() {
        let mut weights = HashMap::new();
        weights.insert("only".to_string(), 5);
        assert_eq!(pick_weighted_queue(&weights), Some("only".to_string()));
    }
}
