//! Presence snapshot handler.

use axum::{extract::State, Json};
use serde::Serialize;

use domain::models::PresenceEntry;
use domain::services::select_active;

use crate::app::AppState;

/// Current presence view: all cached entries plus the selected device.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub devices: Vec<PresenceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<PresenceEntry>,
}

pub async fn list(State(state): State<AppState>) -> Json<PresenceResponse> {
    let devices = state.presence.snapshot().await;
    let selected = select_active(&devices, &state.config.presence.device_keywords).cloned();
    Json(PresenceResponse { devices, selected })
}
