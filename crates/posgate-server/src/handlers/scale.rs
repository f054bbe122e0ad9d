use crate::AppState;
use crate::error::ApiResult;
use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use posgate_devices::LiveWeightEvent;
use serde::Serialize;
use std::time::Duration;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::debug;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
pub struct StableWeightResponse {
    /// Two-decimal formatted weight.
    pub weight: String,
}

/// `GET /v1/stableweight`.
pub async fn stable_weight(State(state): State<AppState>) -> ApiResult<Json<StableWeightResponse>> {
    let weight = state.registry.scale()?.stable_weight().await?;
    Ok(Json(StableWeightResponse {
        weight: weight.formatted(),
    }))
}

/// `GET /v1/liveweight`: server-sent `liveweight` events, starting with the
/// last known sample.
pub async fn live_weight(
    State(state): State<AppState>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let receiver = state.registry.scale()?.live_weight();
    debug!("Live weight subscriber connected");

    let stream = ReceiverStream::new(receiver).map(|event| to_event(&event));
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}

fn to_event(event: &LiveWeightEvent) -> Result<Event, axum::Error> {
    match event {
        LiveWeightEvent::Weight(sample) => Event::default().event("liveweight").json_data(sample),
        LiveWeightEvent::Error(error) => Event::default().event("error").json_data(error),
    }
}
