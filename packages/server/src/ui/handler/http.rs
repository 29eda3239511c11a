//! HTTP endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use survivors_shared::time::timestamp_to_rfc3339;

use crate::{
    infrastructure::dto::http::{HealthDto, ServiceInfoDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    let snapshots = state.registry.list_active().await;
    let now = state.clock.now_millis();
    let uptime_secs = u64::try_from((now - state.started_at) / 1000).unwrap_or(0);

    // Domain Model から DTO への変換
    Json(HealthDto::from_snapshots(
        &snapshots,
        timestamp_to_rfc3339(now, state.offset),
        uptime_secs,
    ))
}

/// Service description served at `/`.
pub async fn service_info() -> Json<ServiceInfoDto> {
    Json(ServiceInfoDto::default())
}

pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "not found"})),
    )
}
