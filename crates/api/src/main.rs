use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use device_monitor_api::jobs::{DiscoveryJob, JobScheduler};
use device_monitor_api::{app, config, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging and metrics
    middleware::logging::init_logging(&config.logging);
    middleware::metrics::init_metrics();

    info!("Starting Device Monitor v{}", env!("CARGO_PKG_VERSION"));

    // The pool is created lazily: the hub must come up and broadcast even
    // with the database unreachable.
    let db_config = persistence::db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout_secs: config.database.connect_timeout_secs,
        idle_timeout_secs: config.database.idle_timeout_secs,
    };
    let pool = persistence::db::create_pool_lazy(&db_config)?;

    if persistence::db::ping(&pool).await {
        info!("Running database migrations...");
        sqlx::migrate!("../persistence/src/migrations")
            .run(&pool)
            .await?;
        info!("Migrations completed");
    }

    // Build shared state and application
    let state = app::build_state(config.clone(), pool);
    state.hub.startup_check().await;
    let router = app::create_app(state.clone());

    // Periodic presence discovery
    let discovery = Arc::new(app::build_discovery(&state));
    let mut discovery_job = DiscoveryJob::new(discovery, config.presence.scan_interval_secs);
    if config.presence.forward_selected {
        discovery_job = discovery_job.with_forwarding(
            Arc::clone(&state.hub),
            config.presence.device_keywords.clone(),
        );
    }
    let mut scheduler = JobScheduler::new();
    scheduler.register(discovery_job);
    scheduler.start();

    // Start server
    let addr = config.socket_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Shutdown order: discovery first, then observer connections, then
    // resolver state. Each step tolerates failure of the previous ones.
    info!("Shutting down");
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(5)).await;
    state.hub.shutdown().await;
    state.resolver.clear_cache().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}
