//! Shared process state the axum router hands to every handler, grounded
//! on `knhk-sidecar::server::SidecarServer`'s bundling of its long-lived
//! collaborators (config, health checker, connectors) behind one `Arc`ed
//! struct cloned into request extensions.

use std::collections::HashMap;
use std::sync::Arc;

use ic_auth::{AuthOrchestrator, ClientRegistry};
use ic_config::ConfigStore;
use ic_query::{Backend, QueryBuilder};
use ic_queue::{JobDispatcher, RedisClient};

use crate::entities::Entity;
use crate::health::HealthRegistry;

/// One entity's full request-time wiring: its query builder plus the
/// identifiers the route handlers need to dispatch and log against.
pub struct EntityRoute {
    pub task_type: &'static str,
    pub builder: QueryBuilder,
}

pub struct AppState {
    pub config: Arc<parking_lot::Mutex<ConfigStore>>,
    pub registry: Arc<ClientRegistry>,
    pub auth: Arc<AuthOrchestrator>,
    pub dispatcher: Arc<JobDispatcher>,
    pub backend: Arc<dyn Backend>,
    pub redis: RedisClient,
    pub health: Arc<HealthRegistry>,
    /// Keyed by URL path segment (`"user-activities"`, ...).
    pub entities: HashMap<&'static str, EntityRoute>,
}

impl AppState {
    pub fn new(
        config: Arc<parking_lot::Mutex<ConfigStore>>,
        registry: Arc<ClientRegistry>,
        auth: Arc<AuthOrchestrator>,
        dispatcher: Arc<JobDispatcher>,
        backend: Arc<dyn Backend>,
        redis: RedisClient,
        health: Arc<HealthRegistry>,
        bucket: &str,
    ) -> Self {
        let entities = crate::entities::all()
            .into_iter()
            .map(|e: Entity| {
                let builder = QueryBuilder::new(bucket.to_string(), e.config);
                (
                    e.path_segment,
                    EntityRoute {
                        task_type: e.task_type,
                        builder,
                    },
                )
            })
            .collect();

        Self {
            config,
            registry,
            auth,
            dispatcher,
            backend,
            redis,
            health,
            entities,
        }
    }
}

pub type SharedState = Arc<AppState>;
