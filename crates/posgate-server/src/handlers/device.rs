//! Endpoints every device category shares.

use crate::AppState;
use crate::error::ApiResult;
use axum::{Json, extract::State, http::StatusCode};
use posgate_core::{DeviceKind, HealthRecord};
use tracing::info;

/// `GET /v1/{device}/health`: live check, refreshing the cache.
pub async fn health(
    State(state): State<AppState>,
    kind: DeviceKind,
) -> ApiResult<Json<Vec<HealthRecord>>> {
    Ok(Json(state.registry.health(kind)?))
}

/// `GET /v1/{device}/healthstatus`: cached health.
pub async fn health_status(
    State(state): State<AppState>,
    kind: DeviceKind,
) -> ApiResult<Json<Vec<HealthRecord>>> {
    Ok(Json(state.registry.status(kind)?))
}

/// `POST /v1/{device}/reconnect`.
pub async fn reconnect(State(state): State<AppState>, kind: DeviceKind) -> ApiResult<StatusCode> {
    info!(%kind, "Manual reconnect requested");
    state.registry.reconnect(kind).await?;
    Ok(StatusCode::OK)
}
