use crate::AppState;
use crate::error::ApiResult;
use crate::handlers::{JsonBody, parse_body};
use axum::{extract::State, http::StatusCode};
use posgate_core::PrintJob;

/// `POST /v1/printer/print`.
pub async fn print(
    State(state): State<AppState>,
    body: JsonBody<PrintJob>,
) -> ApiResult<StatusCode> {
    let job = parse_body(body)?;
    state.registry.printer()?.print(&job).await?;
    Ok(StatusCode::OK)
}
