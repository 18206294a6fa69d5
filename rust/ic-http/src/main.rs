// rust/ic-http/src/main.rs
// Insight-Collector ingest process entry point.

use std::env;
use std::sync::Arc;

use ic_auth::{spawn_janitor, AuthOrchestrator, ClientRegistry, NonceStore};
use ic_config::ConfigStore;
use ic_query::{Backend, HttpInfluxBackend};
use ic_queue::{JobDispatcher, JobRegistry, RedisClient, WorkerConfigStore};
use tracing::{error, info};

use ic_http::health::{ComponentStatus, HealthRegistry};
use ic_http::routes;
use ic_http::state::AppState;

/// §6: the config file's default path in the reference layout.
fn config_path() -> String {
    env::var("CONFIG_PATH").unwrap_or_else(|_| "./.config.json".to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = config_path();
    info!(path = %path, "starting insight-collector");

    // Fatal on startup: config load failure (§7).
    let store = ConfigStore::load(&path).map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;
    let app_config = store.typed().clone();
    let config = Arc::new(parking_lot::Mutex::new(store));

    let health = HealthRegistry::new();

    // Fatal on startup: Redis init failure (§7).
    let redis = RedisClient::connect(&app_config.redis.url).await.map_err(|e| {
        error!(error = %e, "failed to connect to redis");
        e
    })?;
    health.report("redis", ComponentStatus::Healthy, "connected");

    let registry = ClientRegistry::init(config.clone())?;
    let nonces = NonceStore::new();
    let janitor = spawn_janitor(nonces.clone());
    let auth = Arc::new(AuthOrchestrator::new(
        app_config.auth.enabled,
        registry.clone(),
        nonces,
        app_config.auth.algorithm,
    ));

    let job_registry = JobRegistry::default_registry();
    let worker_config = Arc::new(WorkerConfigStore::new(redis.clone()));
    worker_config.load(&job_registry).await.map_err(|e| {
        error!(error = %e, "failed to load worker configuration");
        e
    })?;
    let dispatcher = Arc::new(JobDispatcher::new(redis.clone(), worker_config.clone()));

    // Fatal on startup: time-series client init failure (§7).
    let backend: Arc<dyn Backend> = Arc::new(HttpInfluxBackend::new(
        app_config.influxdb.url.clone(),
        app_config.influxdb.org.clone(),
        app_config.influxdb.bucket.clone(),
        app_config.influxdb.token.clone(),
    ));
    match backend.ping().await {
        Ok(()) => health.report("influxdb", ComponentStatus::Healthy, "connected"),
        Err(e) => {
            health.report("influxdb", ComponentStatus::Degraded, e.to_string());
            error!(error = %e, "time-series backend unreachable at startup");
        }
    }

    let state = Arc::new(AppState::new(
        config,
        registry,
        auth,
        dispatcher,
        backend,
        redis,
        health,
        &app_config.influxdb.bucket,
    ));

    let app = routes::router(state).layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", app_config.app.port);
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    janitor.shutdown().await;
    info!("insight-collector stopped");
    Ok(())
}

/// `SIGINT`/`SIGTERM` initiate the §5 graceful server shutdown (bounded by
/// `app.shutdown_timeout_ms`, 10s by default). `SIGUSR2` (zero-downtime
/// restart trigger) is handled by the supervising process manager, not
/// this binary, per §6's external-collaborator note.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining in-flight requests");
}
