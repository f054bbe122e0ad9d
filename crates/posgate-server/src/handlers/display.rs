use crate::AppState;
use crate::error::ApiResult;
use crate::handlers::{JsonBody, parse_body};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

/// Text for the two display rows. Missing rows are blanked.
#[derive(Debug, Default, Deserialize)]
pub struct DisplayRequest {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
}

/// `POST /v1/linedisplay/display`.
pub async fn display_text(
    State(state): State<AppState>,
    body: JsonBody<DisplayRequest>,
) -> ApiResult<StatusCode> {
    let request = parse_body(body)?;
    state
        .registry
        .line_display()?
        .display(request.line1.as_deref(), request.line2.as_deref())
        .await?;
    Ok(StatusCode::OK)
}
