//! HTTP mapping of device errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use posgate_core::{DeviceError, ErrorCode};
use std::fmt;
use tracing::{debug, warn};

pub type ApiResult<T> = Result<T, ApiError>;

/// A [`DeviceError`] on its way to an HTTP client.
///
/// The body is `{"code", "description"}` with the code's HTTP status.
/// DISABLED maps to 204 and carries no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError(pub DeviceError);

impl ApiError {
    pub fn invalid_format(description: impl Into<String>) -> Self {
        Self(DeviceError::with_description(
            ErrorCode::InvalidFormat,
            description,
        ))
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self(DeviceError::with_description(
            ErrorCode::DeviceOffline,
            description,
        ))
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ApiError {}

impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(code = %self.0.code, description = %self.0.description, "Request failed");
        } else {
            debug!(code = %self.0.code, %status, "Request rejected");
        }

        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }
        (status, Json(self.0)).into_response()
    }
}
