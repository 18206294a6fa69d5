//! §6 health endpoints: `/v1/health/live`, `/v1/health/ready`,
//! `/v1/health`. Grounded on `knhk-sidecar::health::HealthChecker`
//! (component registration + aggregated status), extended with the
//! three-way liveness/readiness/detailed split §6 calls for: liveness is
//! unconditional, readiness depends on Redis + time-series reachability.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

struct Component {
    status: ComponentStatus,
    message: String,
}

/// Aggregates the health of the process's critical dependencies.
pub struct HealthRegistry {
    components: Mutex<HashMap<String, Component>>,
    started_at: Instant,
}

impl HealthRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            components: Mutex::new(HashMap::new()),
            started_at: Instant::now(),
        })
    }

    pub fn report(&self, name: &str, status: ComponentStatus, message: impl Into<String>) {
        let message = message.into();
        if status == ComponentStatus::Unhealthy {
            warn!(component = name, %message, "dependency unhealthy");
        }
        self.components.lock().insert(
            name.to_string(),
            Component { status, message },
        );
    }

    /// `/v1/health/live`: unconditional, process is accepting connections.
    pub fn liveness(&self) -> (&'static str, std::time::Duration) {
        ("alive", self.started_at.elapsed())
    }

    /// `/v1/health/ready`: `true` unless a critical dependency reports
    /// `Unhealthy`. `Degraded` still counts as ready.
    pub fn is_ready(&self) -> bool {
        !self
            .components
            .lock()
            .values()
            .any(|c| c.status == ComponentStatus::Unhealthy)
    }

    /// `/v1/health`: per-component breakdown for operators.
    pub fn detail(&self) -> Vec<(String, ComponentStatus, String)> {
        self.components
            .lock()
            .iter()
            .map(|(name, c)| (name.clone(), c.status, c.message.clone()))
            .collect()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self {
            components: Mutex::new(HashMap::new()),
            started_at: Instant::now(),
        }
    }
}
