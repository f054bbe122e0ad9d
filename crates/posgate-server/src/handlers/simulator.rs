//! `/v1/simulator` control endpoints.
//!
//! Each call injects a hardware-side happening into a simulated device. The
//! resulting callbacks travel the same driver event channel as real ones.

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{JsonBody, parse_body};
use crate::simulator::{Simulator, simulation_error};
use axum::{
    Json,
    extract::{Path, State},
};
use posgate_core::{DeviceKind, MicrData, ScaleStatus, Weight};
use posgate_hardware::{DriverError, PowerState, codes};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn simulator(state: &AppState) -> ApiResult<&Arc<Simulator>> {
    state
        .simulator
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Simulator is disabled"))
}

#[derive(Debug, Serialize)]
pub struct Delivered {
    /// Whether the device accepted the input. A disabled scanner ignores its
    /// trigger and a scale without status notification drops live samples.
    pub delivered: bool,
}

#[derive(Debug, Serialize)]
pub struct Affected {
    pub devices: usize,
}

#[derive(Debug, Deserialize)]
pub struct BarcodeRequest {
    pub data: String,
    /// Native symbology code; unknown when absent.
    #[serde(default)]
    pub data_type: Option<i32>,
}

/// `POST /v1/simulator/scanner/{name}/barcode`.
pub async fn scan_barcode(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: JsonBody<BarcodeRequest>,
) -> ApiResult<Json<Delivered>> {
    let request = parse_body(body)?;
    let scanner = simulator(&state)?.scanner(&name)?;
    let delivered = scanner
        .scan(
            request.data,
            request.data_type.unwrap_or(codes::SCAN_SDT_UNKNOWN),
        )
        .await
        .map_err(simulation_error)?;
    Ok(Json(Delivered { delivered }))
}

#[derive(Debug, Deserialize)]
pub struct LiveWeightRequest {
    pub status: ScaleStatus,
    /// Raw device units.
    #[serde(default)]
    pub weight: Option<u32>,
}

/// `POST /v1/simulator/scale/weight`: push a live sample.
pub async fn live_weight(
    State(state): State<AppState>,
    body: JsonBody<LiveWeightRequest>,
) -> ApiResult<Json<Delivered>> {
    let request = parse_body(body)?;
    let delivered = simulator(&state)?
        .scale()?
        .set_live_weight(request.status, request.weight.map(Weight))
        .await
        .map_err(simulation_error)?;
    Ok(Json(Delivered { delivered }))
}

/// Outcome of the next stable read: a weight, or a failure with an extended
/// scale code.
#[derive(Debug, Deserialize)]
pub struct StableWeightRequest {
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub extended: Option<i32>,
}

/// `POST /v1/simulator/scale/stableweight`.
pub async fn stable_weight(
    State(state): State<AppState>,
    body: JsonBody<StableWeightRequest>,
) -> ApiResult<Json<Delivered>> {
    let request = parse_body(body)?;
    let scale = simulator(&state)?.scale()?;
    match (request.weight, request.extended) {
        (Some(weight), None) => scale.place_stable_weight(Weight(weight)),
        (None, Some(extended)) => {
            scale.fail_next_read(DriverError::extended(extended, "Simulated scale error"))
        }
        _ => {
            return Err(ApiError::invalid_format(
                "Exactly one of weight or extended is required",
            ));
        }
    }
    Ok(Json(Delivered { delivered: true }))
}

/// A check to place in the reader.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CheckInsertRequest {
    /// A check whose MICR line fails to read with `extended`.
    Unreadable { extended: i32 },
    Readable(MicrData),
}

/// `POST /v1/simulator/check/insert`.
pub async fn insert_check(
    State(state): State<AppState>,
    body: JsonBody<CheckInsertRequest>,
) -> ApiResult<Json<Delivered>> {
    let request = parse_body(body)?;
    let reader = simulator(&state)?.check_reader()?;
    match request {
        CheckInsertRequest::Unreadable { extended } => reader.insert_unreadable_check(extended),
        CheckInsertRequest::Readable(micr) => reader.insert_check(micr),
    }
    Ok(Json(Delivered { delivered: true }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerSetting {
    Online,
    Off,
    Offline,
    OffOffline,
}

impl From<PowerSetting> for PowerState {
    fn from(setting: PowerSetting) -> Self {
        match setting {
            PowerSetting::Online => Self::Online,
            PowerSetting::Off => Self::Off,
            PowerSetting::Offline => Self::Offline,
            PowerSetting::OffOffline => Self::OffOffline,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PowerRequest {
    pub state: PowerSetting,
    /// Single device to target; every device of the kind when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /v1/simulator/{device}/power`.
pub async fn power(
    State(state): State<AppState>,
    kind: DeviceKind,
    body: JsonBody<PowerRequest>,
) -> ApiResult<Json<Affected>> {
    let request = parse_body(body)?;
    let devices = simulator(&state)?
        .power(kind, request.name.as_deref(), request.state.into())
        .await?;
    Ok(Json(Affected { devices }))
}

#[derive(Debug, Deserialize)]
pub struct ErrorRequest {
    pub code: i32,
    #[serde(default)]
    pub extended: i32,
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /v1/simulator/{device}/error`.
pub async fn inject_error(
    State(state): State<AppState>,
    kind: DeviceKind,
    body: JsonBody<ErrorRequest>,
) -> ApiResult<Json<Affected>> {
    let request = parse_body(body)?;
    let devices = simulator(&state)?
        .inject_error(kind, request.name.as_deref(), request.code, request.extended)
        .await?;
    Ok(Json(Affected { devices }))
}

#[derive(Debug, Serialize)]
pub struct DisplayContents {
    pub rows: Vec<String>,
    pub writes: usize,
}

/// `GET /v1/simulator/linedisplay`.
pub async fn display_contents(State(state): State<AppState>) -> ApiResult<Json<DisplayContents>> {
    let display = simulator(&state)?.line_display()?;
    Ok(Json(DisplayContents {
        rows: display.rows(),
        writes: display.writes(),
    }))
}
