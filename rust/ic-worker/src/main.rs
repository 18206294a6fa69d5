// rust/ic-worker/src/main.rs
// Insight-Collector worker process entry point (C7, C8).

use std::env;
use std::sync::Arc;

use ic_config::ConfigStore;
use ic_http::enrichment::{Enricher, NullEnricher};
use ic_query::{Backend, HttpInfluxBackend};
use ic_queue::{JobRegistry, RedisClient, WorkerConfigStore, WorkerRuntime};
use tracing::{error, info};

use ic_worker::handlers::EventPersistHandler;

fn config_path() -> String {
    env::var("CONFIG_PATH").unwrap_or_else(|_| "./.config.json".to_string())
}

fn instance_id() -> String {
    let host = env::var("HOSTNAME").unwrap_or_else(|_| "worker".to_string());
    format!("{host}-{}", std::process::id())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = config_path();
    info!(path = %path, "starting insight-collector worker");

    // Fatal on startup: config load failure (§7).
    let store = ConfigStore::load(&path).map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;
    let app_config = store.typed().clone();

    // Fatal on startup: Redis init failure (§7).
    let redis = RedisClient::connect(&app_config.redis.url).await.map_err(|e| {
        error!(error = %e, "failed to connect to redis");
        e
    })?;

    let job_registry = JobRegistry::default_registry();
    let worker_config = Arc::new(WorkerConfigStore::new(redis.clone()));
    worker_config.load(&job_registry).await.map_err(|e| {
        error!(error = %e, "failed to load worker configuration");
        e
    })?;
    worker_config.validate();

    // Fatal on startup: time-series client init failure (§7).
    let backend: Arc<dyn Backend> = Arc::new(HttpInfluxBackend::new(
        app_config.influxdb.url.clone(),
        app_config.influxdb.org.clone(),
        app_config.influxdb.bucket.clone(),
        app_config.influxdb.token.clone(),
    ));

    // Non-fatal: GeoIP init failure degrades to default-valued enrichment
    // (§7). No real provider is wired (Non-goal), so this is always the
    // degraded path, logged once at construction.
    let enricher: Arc<dyn Enricher> = Arc::new(NullEnricher::new());

    let concurrency = app_config.asynq.concurrency as usize;
    let mut runtime = WorkerRuntime::new(redis, worker_config.clone(), concurrency, instance_id());

    for entity in ic_http::entities::all() {
        runtime.register_handler(Arc::new(EventPersistHandler::new(
            entity.task_type,
            entity.config,
            backend.clone(),
            enricher.clone(),
        )));
    }

    info!(concurrency, "worker runtime configured, starting");
    Arc::new(runtime).run().await?;

    info!("insight-collector worker stopped");
    Ok(())
}
