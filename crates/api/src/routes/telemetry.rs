//! Telemetry ingress and readout handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use domain::models::{TelemetryAccepted, TelemetryRecord};
use persistence::repositories::TelemetryRepository;

use crate::app::AppState;
use crate::error::ApiError;

/// Request/response ingress: accepts the same flat JSON shape as the
/// observer protocol and routes it through the hub (persist + broadcast).
///
/// The raw body is forwarded untouched so WebSocket observers receive the
/// exact bytes that were posted.
pub async fn ingest(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<TelemetryAccepted>, ApiError> {
    match state.hub.publish(&body).await {
        Ok(device_id) => Ok(Json(TelemetryAccepted {
            accepted: true,
            device_id,
        })),
        Err(err) => Err(ApiError::Validation(err.to_string())),
    }
}

/// Most recent reading for a device.
pub async fn latest(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<TelemetryRecord>, ApiError> {
    let repo = TelemetryRepository::new(state.pool.clone());
    let entity = repo.latest_for_device(&device_id).await?;
    entity
        .map(|e| Json(e.into()))
        .ok_or_else(|| ApiError::NotFound(format!("No telemetry for device {}", device_id)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Reading history for a device, newest first.
pub async fn history(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TelemetryRecord>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.config.hub.history_limit)
        .clamp(1, state.config.hub.history_limit_max);

    let repo = TelemetryRepository::new(state.pool.clone());
    let records = repo
        .history(&device_id, limit)
        .await?
        .into_iter()
        .map(TelemetryRecord::from)
        .collect();
    Ok(Json(records))
}
