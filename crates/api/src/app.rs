use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use domain::services::{
    DiscoveryService, LocationResolver, LocationSource, PresenceCache, ResolverSettings,
};

use crate::config::Config;
use crate::hub::TelemetryHub;
use crate::middleware::{metrics_handler, metrics_middleware};
use crate::routes::{health, presence, telemetry, ws};
use crate::services::{
    CommandGpsSource, CommandScanner, GeolocationApiSource, IpGeolocationSource, SurveySource,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub hub: Arc<TelemetryHub>,
    pub presence: Arc<PresenceCache>,
    pub resolver: Arc<LocationResolver>,
}

/// Assemble the shared application state: hub, presence cache, and the
/// location source chain in its fallback order (direct fix, network-assisted,
/// survey, IP).
pub fn build_state(config: Config, pool: PgPool) -> AppState {
    let config = Arc::new(config);

    let hub = Arc::new(TelemetryHub::new(
        pool.clone(),
        config.hub.default_device.clone(),
    ));

    let presence = Arc::new(PresenceCache::new(Duration::from_secs(
        config.presence.staleness_window_secs,
    )));

    let settings = ResolverSettings {
        source_timeout: Duration::from_secs(config.resolver.source_timeout_secs),
        anchor_latitude: config.resolver.anchor_latitude,
        anchor_longitude: config.resolver.anchor_longitude,
    };

    let mut sources: Vec<Arc<dyn LocationSource>> = Vec::new();
    if !config.resolver.gps_command.is_empty() {
        sources.push(Arc::new(CommandGpsSource::new(
            config.resolver.gps_command.clone(),
        )));
    }
    if !config.resolver.geolocation_api_url.is_empty() {
        sources.push(Arc::new(GeolocationApiSource::new(
            config.resolver.geolocation_api_url.clone(),
            config.resolver.geolocation_api_key.clone(),
            settings.source_timeout,
        )));
    }
    if !config.resolver.survey_command.is_empty() {
        sources.push(Arc::new(SurveySource::new(
            config.resolver.survey_command.clone(),
            settings.anchor_latitude,
            settings.anchor_longitude,
        )));
    }
    sources.push(Arc::new(IpGeolocationSource::new(
        config.resolver.ip_api_url.clone(),
        settings.source_timeout,
    )));

    let resolver = Arc::new(LocationResolver::new(sources, settings));

    AppState {
        pool,
        config,
        hub,
        presence,
        resolver,
    }
}

/// Discovery service wired to the state's scanner, resolver and cache.
pub fn build_discovery(state: &AppState) -> DiscoveryService {
    DiscoveryService::new(
        Arc::new(CommandScanner::new(state.config.presence.scan_command.clone())),
        Arc::clone(&state.resolver),
        Arc::clone(&state.presence),
    )
}

pub fn create_app(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    // REST surface gets the request timeout; the WebSocket route must not,
    // or long-lived observer connections would be cut.
    let api_routes = Router::new()
        .route("/api/v1/telemetry", post(telemetry::ingest))
        .route(
            "/api/v1/telemetry/:device_id/latest",
            get(telemetry::latest),
        )
        .route(
            "/api/v1/telemetry/:device_id/history",
            get(telemetry::history),
        )
        .route("/api/v1/presence", get(presence::list))
        .layer(TimeoutLayer::new(request_timeout));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let ws_routes = Router::new().route("/ws/dashboard", get(ws::ws_handler));

    // Compression stays off the WebSocket route; the upgrade response must
    // pass through untouched.
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .merge(ws_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
