use crate::AppState;
use crate::error::ApiResult;
use axum::{Json, extract::State, http::StatusCode};
use posgate_core::MicrData;

/// `GET /v1/check`: wait for a check and return its MICR line.
pub async fn read_check(State(state): State<AppState>) -> ApiResult<Json<MicrData>> {
    let micr = state.registry.check_reader()?.insert_check().await?;
    Ok(Json(micr))
}

/// `DELETE /v1/check`: cancel a pending read and eject any check.
pub async fn withdraw_check(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.registry.check_reader()?.withdraw_check().await?;
    Ok(StatusCode::NO_CONTENT)
}
