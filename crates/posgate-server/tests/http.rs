//! HTTP round trips through the full router and simulated devices.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use posgate_core::DeviceKind;
use posgate_server::{AppState, GatewayConfig, build_router};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

const ALL_KINDS: [DeviceKind; 5] = [
    DeviceKind::Scanner,
    DeviceKind::Scale,
    DeviceKind::CheckReader,
    DeviceKind::LineDisplay,
    DeviceKind::Printer,
];

async fn gateway(config: GatewayConfig) -> (Router, AppState) {
    let state = AppState::from_config(&config);
    for kind in state.registry.kinds() {
        state.registry.connect(kind).await.unwrap();
    }
    (build_router(state.clone()), state)
}

async fn connected_gateway() -> (Router, AppState) {
    gateway(GatewayConfig::default()).await
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn scanner_armed(state: &AppState, name: &str) -> bool {
    state
        .simulator
        .as_ref()
        .unwrap()
        .scanner(name)
        .unwrap()
        .is_armed()
}

#[tokio::test]
async fn test_health_and_healthstatus() {
    let state = AppState::from_config(&GatewayConfig::default());
    let app = build_router(state.clone());

    let (status, body) = send(app.clone(), get("/v1/printer/healthstatus")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["deviceName"], "Printer");
    assert_eq!(body[0]["healthStatus"], "NOT_READY");

    for kind in ALL_KINDS {
        state.registry.connect(kind).await.unwrap();
    }
    for kind in ALL_KINDS {
        let uri = format!("/v1/{}/health", kind.path_segment());
        let (status, body) = send(app.clone(), get(&uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(
            body.as_array()
                .unwrap()
                .iter()
                .all(|r| r["healthStatus"] == "READY"),
            "{uri}: {body}"
        );
    }

    let (_, scanners) = send(app, get("/v1/scanner/healthstatus")).await;
    assert_eq!(scanners.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_display_writes_both_rows() {
    let (app, _state) = connected_gateway().await;

    let (status, _) = send(
        app.clone(),
        post("/v1/linedisplay/display", json!({ "line1": "Hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, contents) = send(app, get("/v1/simulator/linedisplay")).await;
    assert_eq!(
        contents["rows"],
        json!(["Hi                  ", "                    "])
    );
}

#[tokio::test]
async fn test_scan_round_trip_and_busy() {
    let (app, state) = connected_gateway().await;

    let scan = tokio::spawn(send(app.clone(), get("/v1/scan/flatbed")));
    until(|| scanner_armed(&state, "Flatbed")).await;

    let (status, body) = send(app.clone(), get("/v1/scan")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DEVICE_BUSY");

    let (status, body) = send(
        app.clone(),
        post(
            "/v1/simulator/scanner/Flatbed/barcode",
            json!({ "data": "012345678905", "data_type": 101 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);

    let (status, barcode) = scan.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(barcode["data"], "012345678905");
    assert_eq!(barcode["symbology"], "UPC_A");
    assert_eq!(barcode["scanner"], "Flatbed");
}

#[tokio::test]
async fn test_cancelled_scan_is_no_content() {
    let (app, state) = connected_gateway().await;

    let scan = tokio::spawn(send(app.clone(), get("/v1/scan")));
    until(|| scanner_armed(&state, "Flatbed") && scanner_armed(&state, "Handheld")).await;

    let (status, _) = send(app.clone(), delete("/v1/scan")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = scan.await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(app, delete("/v1/scan/HANDHELD")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ALREADY_DISABLED");
}

#[tokio::test]
async fn test_unknown_scanner_type_is_invalid_format() {
    let (app, _state) = connected_gateway().await;
    let (status, body) = send(app, get("/v1/scan/WAND")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn test_stable_weight() {
    let (app, _state) = connected_gateway().await;

    send(
        app.clone(),
        post("/v1/simulator/scale/stableweight", json!({ "weight": 12345 })),
    )
    .await;
    let (status, body) = send(app.clone(), get("/v1/stableweight")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weight"], "12.34");

    send(
        app.clone(),
        post("/v1/simulator/scale/stableweight", json!({ "extended": 202 })),
    )
    .await;
    let (status, body) = send(app, get("/v1/stableweight")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNDER_ZERO");
}

#[tokio::test]
async fn test_live_weight_stream() {
    let (app, state) = connected_gateway().await;
    let scale = state.simulator.as_ref().unwrap().scale().unwrap();

    while !scale
        .set_live_weight(posgate_core::ScaleStatus::Stable, Some(posgate_core::Weight(1500)))
        .await
        .unwrap()
    {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = app.oneshot(get("/v1/liveweight")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let mut frames = response.into_body().into_data_stream();
    let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let frame = String::from_utf8(frame.to_vec()).unwrap();
    assert!(frame.contains("event: liveweight"), "{frame}");
    assert!(frame.contains(r#""weight":"1.50""#), "{frame}");
    assert!(frame.contains(r#""status":"STABLE""#), "{frame}");
}

#[tokio::test]
async fn test_check_read_and_eject() {
    let (app, state) = connected_gateway().await;

    send(
        app.clone(),
        post(
            "/v1/simulator/check/insert",
            json!({
                "rawData": "t011000015t 0001234567o",
                "transitNumber": "011000015",
                "accountNumber": "0001234567"
            }),
        ),
    )
    .await;

    let (status, micr) = send(app.clone(), get("/v1/check")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(micr["accountNumber"], "0001234567");

    let (status, _) = send(app, delete("/v1/check")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let reader = state.simulator.as_ref().unwrap().check_reader().unwrap();
    assert_eq!(reader.ejections(), 1);
}

#[tokio::test]
async fn test_unreadable_check_is_bad_data() {
    let (app, _state) = connected_gateway().await;
    send(
        app.clone(),
        post("/v1/simulator/check/insert", json!({ "extended": 207 })),
    )
    .await;

    let (status, body) = send(app, get("/v1/check")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_DATA");
}

#[tokio::test]
async fn test_print_job() {
    let (app, _state) = connected_gateway().await;

    let job = json!({
        "station": "RECEIPT",
        "items": [
            { "type": "text", "text": "Total 4.99" },
            { "type": "barcode", "data": "0123456789" },
            { "type": "feed", "lines": 3 },
            { "type": "cut" }
        ]
    });
    let (status, _) = send(app.clone(), post("/v1/printer/print", job)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app.clone(), post("/v1/printer/print", json!({ "items": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FORMAT");

    let (status, body) = send(
        app,
        post("/v1/printer/print", json!({ "items": [{ "type": "fax" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn test_power_off_marks_device_not_ready() {
    let (app, state) = connected_gateway().await;

    let (status, body) = send(
        app.clone(),
        post("/v1/simulator/printer/power", json!({ "state": "OFF" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["devices"], 1);

    let printer = state.registry.printer().unwrap();
    until(|| !printer.is_connected()).await;
    let (_, health) = send(app.clone(), get("/v1/printer/health")).await;
    assert_eq!(health[0]["healthStatus"], "NOT_READY");

    let (status, body) = send(app, post("/v1/printer/reconnect", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "DEVICE_OFFLINE");
}

#[tokio::test]
async fn test_unconfigured_device_is_offline() {
    let mut config = GatewayConfig::default();
    config.scale.enabled = false;
    let (app, _state) = gateway(config).await;

    let (status, body) = send(app.clone(), get("/v1/stableweight")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "DEVICE_OFFLINE");

    let (status, _) = send(app, post("/v1/scale/reconnect", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_simulator_routes_can_be_disabled() {
    let mut config = GatewayConfig::default();
    config.simulator.enabled = false;
    let (app, state) = gateway(config).await;

    assert!(state.simulator.is_none());
    let (status, _) = send(app, get("/v1/simulator/linedisplay")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
