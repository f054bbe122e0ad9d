//! Request handlers, one module per device category.

pub mod check;
pub mod device;
pub mod display;
pub mod printer;
pub mod scale;
pub mod scan;
pub mod simulator;

use crate::error::{ApiError, ApiResult};
use axum::Json;
use axum::extract::rejection::JsonRejection;

/// A JSON body whose rejection is reported as INVALID_FORMAT.
pub type JsonBody<T> = Result<Json<T>, JsonRejection>;

pub(crate) fn parse_body<T>(body: JsonBody<T>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_format(rejection.body_text()))
}
