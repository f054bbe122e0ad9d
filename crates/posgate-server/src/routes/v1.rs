use crate::AppState;
use crate::handlers::simulator::{self, ErrorRequest, PowerRequest};
use crate::handlers::{JsonBody, check, device, display, printer, scale, scan};
use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use posgate_core::DeviceKind;

const DEVICE_KINDS: [DeviceKind; 5] = [
    DeviceKind::Scanner,
    DeviceKind::Scale,
    DeviceKind::CheckReader,
    DeviceKind::LineDisplay,
    DeviceKind::Printer,
];

/// Device endpoints.
pub fn create_v1_router() -> Router<AppState> {
    let router = Router::new()
        .route("/check", get(check::read_check).delete(check::withdraw_check))
        .route("/linedisplay/display", post(display::display_text))
        .route("/scan", get(scan::scan_any).delete(scan::cancel_scan))
        .route(
            "/scan/{scanner_type}",
            get(scan::scan_typed).delete(scan::cancel_scan),
        )
        .route("/liveweight", get(scale::live_weight))
        .route("/stableweight", get(scale::stable_weight))
        .route("/printer/print", post(printer::print));

    DEVICE_KINDS
        .into_iter()
        .fold(router, |router, kind| router.merge(device_routes(kind)))
}

/// `/{device}/health`, `/{device}/healthstatus` and `/{device}/reconnect`.
fn device_routes(kind: DeviceKind) -> Router<AppState> {
    let base = format!("/{}", kind.path_segment());
    Router::new()
        .route(
            &format!("{base}/health"),
            get(move |state: State<AppState>| device::health(state, kind)),
        )
        .route(
            &format!("{base}/healthstatus"),
            get(move |state: State<AppState>| device::health_status(state, kind)),
        )
        .route(
            &format!("{base}/reconnect"),
            post(move |state: State<AppState>| device::reconnect(state, kind)),
        )
}

/// Simulator control endpoints, nested under `/simulator`.
pub fn create_simulator_router() -> Router<AppState> {
    let router = Router::new()
        .route("/scanner/{name}/barcode", post(simulator::scan_barcode))
        .route("/scale/weight", post(simulator::live_weight))
        .route("/scale/stableweight", post(simulator::stable_weight))
        .route("/check/insert", post(simulator::insert_check))
        .route("/linedisplay", get(simulator::display_contents));

    DEVICE_KINDS.into_iter().fold(router, |router, kind| {
        let base = format!("/{}", kind.path_segment());
        router
            .route(
                &format!("{base}/power"),
                post(move |state: State<AppState>, body: JsonBody<PowerRequest>| {
                    simulator::power(state, kind, body)
                }),
            )
            .route(
                &format!("{base}/error"),
                post(move |state: State<AppState>, body: JsonBody<ErrorRequest>| {
                    simulator::inject_error(state, kind, body)
                }),
            )
    })
}
