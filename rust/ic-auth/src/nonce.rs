//! C11: Nonce Store + Janitor.
//!
//! Mutated under its own `std::sync::Mutex` per §5's shared-resource
//! policy. The janitor is a `tokio::spawn`ed loop, shut down cleanly via a
//! `tokio::sync::Notify`, matching the background-task shape used by
//! `knhk-sidecar::key_rotation::KeyRotationManager::start_background_task`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info};

/// Retention window for a seen nonce: 5 minutes from first sighting (§3,
/// §9 open question 1 — kept as specified; the 30s timestamp window in C3
/// is the real replay defense).
pub const RETENTION_SECS: i64 = 300;
/// Sweep cadence.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceCheck {
    Fresh,
    Replayed,
}

/// In-memory store of recently-seen nonces.
pub struct NonceStore {
    seen: Mutex<HashMap<String, i64>>,
}

impl NonceStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(HashMap::new()),
        })
    }

    /// Atomic check-and-insert: `Fresh` on first sighting, `Replayed` if
    /// already present. `now` is the caller-supplied current time (seconds)
    /// so insertion ordering is linearizable under the mutex.
    pub fn check_and_insert(&self, nonce: &str, now: i64) -> NonceCheck {
        let mut seen = self.seen.lock().unwrap();
        if seen.contains_key(nonce) {
            NonceCheck::Replayed
        } else {
            seen.insert(nonce.to_string(), now);
            NonceCheck::Fresh
        }
    }

    /// Remove entries older than `RETENTION_SECS` relative to `now`.
    pub fn sweep(&self, now: i64) {
        let mut seen = self.seen.lock().unwrap();
        let before = seen.len();
        seen.retain(|_, first_seen| now - *first_seen <= RETENTION_SECS);
        let removed = before - seen.len();
        if removed > 0 {
            debug!(removed, "nonce janitor swept expired entries");
        }
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a running janitor task; dropping or calling `shutdown` stops
/// it cleanly on the next tick boundary.
pub struct JanitorHandle {
    stop: Arc<Notify>,
    task: tokio::task::JoinHandle<()>,
}

impl JanitorHandle {
    pub async fn shutdown(self) {
        self.stop.notify_one();
        let _ = self.task.await;
    }
}

/// Spawns the periodic sweep task (§4.11).
pub fn spawn_janitor(store: Arc<NonceStore>) -> JanitorHandle {
    let stop = Arc::new(Notify::new());
    let stop_rx = stop.clone();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(SWEEP_INTERVAL) => {
                    let now = chrono::Utc::now().timestamp();
                    store.sweep(now);
                }
                _ = stop_rx.notified() => {
                    info!("nonce janitor shutting down");
                    break;
                }
            }
        }
    });

    JanitorHandle { stop, task }
}
