use crate::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use posgate_core::{Barcode, ScanTarget};

/// `GET /v1/scan`: race every scanner.
pub async fn scan_any(State(state): State<AppState>) -> ApiResult<Json<Barcode>> {
    scan(&state, ScanTarget::Both).await
}

/// `GET /v1/scan/{FLATBED|HANDHELD}`.
pub async fn scan_typed(
    State(state): State<AppState>,
    Path(scanner_type): Path<String>,
) -> ApiResult<Json<Barcode>> {
    let target = scanner_type
        .parse::<ScanTarget>()
        .map_err(ApiError::invalid_format)?;
    scan(&state, target).await
}

async fn scan(state: &AppState, target: ScanTarget) -> ApiResult<Json<Barcode>> {
    let barcode = state.registry.scanners()?.get_data(target).await?;
    Ok(Json(barcode))
}

/// `DELETE /v1/scan[/{type}]`: cancel the scan in flight.
pub async fn cancel_scan(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.registry.scanners()?.cancel_scan_request()?;
    Ok(StatusCode::NO_CONTENT)
}
