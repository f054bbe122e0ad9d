//! End-to-end scenarios across the device layer, driven through simulated
//! hardware.

mod common;

use common::{ALL_KINDS, connected_rig, eventually, rig};
use posgate_core::{
    ConnectionState, DeviceError, DeviceKind, ErrorCode, HealthStatus, MicrData, ScanTarget,
    Weight,
};
use posgate_devices::{ConnectionLock, DeviceSession};
use posgate_hardware::codes;
use posgate_hardware::mock::{MockLineDisplay, MockOp, SimulatorControl};
use posgate_hardware::{DriverError, PowerState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn test_repeated_connect_notifies_once() {
    let (display, _handle) = MockLineDisplay::new("Line Display");
    let session = DeviceSession::new(display, Duration::from_secs(1));
    let mut edges = session.subscribe();

    session.connect().await;
    session.connect().await;
    session.disconnect().await;

    assert_eq!(edges.recv().await.unwrap().state, ConnectionState::Connected);
    assert_eq!(edges.recv().await.unwrap().state, ConnectionState::Disconnected);
    assert!(edges.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_lock_is_released_when_guarded_work_fails() {
    let lock = ConnectionLock::new("Printer", Duration::from_secs(10));

    let failing = async {
        let _guard = lock.lock_or_busy().await?;
        Err::<(), _>(DeviceError::offline())
    };
    assert!(failing.await.is_err());

    let started = Instant::now();
    assert!(lock.try_lock().await.is_some());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_startup_status_checks_live_once_per_device() {
    let rig = rig();
    for kind in ALL_KINDS {
        let first = rig.registry.status(kind).unwrap();
        assert!(first.iter().all(|r| r.health_status == HealthStatus::NotReady));
    }

    for kind in ALL_KINDS {
        rig.registry.connect(kind).await.unwrap();
    }

    // First status read after the first connect attempt refreshes live...
    for kind in ALL_KINDS {
        let refreshed = rig.registry.status(kind).unwrap();
        assert!(refreshed.iter().all(|r| r.health_status == HealthStatus::Ready));
    }

    // ...and later reads are served from cache until an explicit health check.
    rig.display.set_attached(false);
    rig.registry
        .line_display()
        .unwrap()
        .reconnect()
        .await
        .unwrap_err();
    let cached = rig.registry.status(DeviceKind::LineDisplay).unwrap();
    assert_eq!(cached[0].health_status, HealthStatus::Ready);

    let live = rig.registry.health(DeviceKind::LineDisplay).unwrap();
    assert_eq!(live[0].health_status, HealthStatus::NotReady);
    let cached = rig.registry.status(DeviceKind::LineDisplay).unwrap();
    assert_eq!(cached[0].health_status, HealthStatus::NotReady);
}

#[tokio::test]
async fn test_scan_race_returns_first_and_cancels_silent_scanner() {
    let rig = connected_rig().await;
    let scanners = Arc::clone(rig.registry.scanners().unwrap());

    let scan = tokio::spawn({
        let scanners = Arc::clone(&scanners);
        async move { scanners.get_data(ScanTarget::Both).await }
    });
    eventually(|| rig.flatbed.is_armed() && rig.handheld.is_armed()).await;

    // A second client is turned away while the race is on.
    let busy = scanners.get_data(ScanTarget::Flatbed).await.unwrap_err();
    assert_eq!(busy.code, ErrorCode::DeviceBusy);
    assert_eq!(busy.http_status(), 409);

    assert!(rig.flatbed.scan("012345678905", codes::SCAN_SDT_UPCA).await.unwrap());
    let barcode = scan.await.unwrap().unwrap();
    assert_eq!(barcode.data, "012345678905");
    assert_eq!(barcode.scanner, "Flatbed");

    assert!(!rig.handheld.is_enabled());
    assert!(!rig.handheld.scan("late", codes::SCAN_SDT_CODE128).await.unwrap());
}

#[tokio::test]
async fn test_cancelled_scan_reports_disabled() {
    let rig = connected_rig().await;
    let scanners = Arc::clone(rig.registry.scanners().unwrap());

    let scan = tokio::spawn({
        let scanners = Arc::clone(&scanners);
        async move { scanners.get_data(ScanTarget::Handheld).await }
    });
    eventually(|| rig.handheld.is_armed()).await;
    scanners.cancel_scan_request().unwrap();

    let error = scan.await.unwrap().unwrap_err();
    assert_eq!(error.code, ErrorCode::Disabled);
    assert_eq!(error.http_status(), 204);
    assert_eq!(
        scanners.cancel_scan_request().unwrap_err().code,
        ErrorCode::AlreadyDisabled
    );
}

#[tokio::test]
async fn test_stable_weight_device_error_is_mapped() {
    let rig = connected_rig().await;
    rig.scale
        .fail_next_read(DriverError::extended(codes::ESCAL_UNDER_ZERO, "under zero"));

    let error = rig.registry.scale().unwrap().stable_weight().await.unwrap_err();
    assert_eq!(error.code, ErrorCode::UnderZero);
    assert_eq!(error.http_status(), 400);
}

#[tokio::test]
async fn test_stable_weight_read() {
    let rig = connected_rig().await;
    rig.scale.place_stable_weight(Weight(12345));

    let weight = rig.registry.scale().unwrap().stable_weight().await.unwrap();
    assert_eq!(weight.formatted(), "12.34");
}

#[tokio::test(start_paused = true)]
async fn test_silent_scale_times_out_after_inner_bound() {
    let rig = connected_rig().await;
    let started = Instant::now();

    let error = rig.registry.scale().unwrap().stable_weight().await.unwrap_err();
    assert_eq!(error.code, ErrorCode::Timeout);
    assert!(started.elapsed() < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn test_wedged_scale_returns_within_hang_bound() {
    let rig = connected_rig().await;
    rig.scale.hang_reads(true);
    let started = Instant::now();

    let error = rig.registry.scale().unwrap().stable_weight().await.unwrap_err();
    assert_eq!(error.code, ErrorCode::Timeout);
    assert!(started.elapsed() <= Duration::from_secs(31));
}

#[tokio::test]
async fn test_line_display_pads_rows() {
    let rig = connected_rig().await;
    rig.registry
        .line_display()
        .unwrap()
        .display(Some("Hi"), None)
        .await
        .unwrap();

    assert_eq!(
        rig.display.rows(),
        ["Hi                  ", "                    "]
    );
}

#[tokio::test]
async fn test_bad_micr_line_is_bad_data() {
    let rig = connected_rig().await;
    rig.check.insert_unreadable_check(codes::EMICR_CHECKDIGIT);

    let error = rig
        .registry
        .check_reader()
        .unwrap()
        .insert_check()
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::BadData);
    assert_eq!(error.http_status(), 400);
}

#[tokio::test]
async fn test_check_read_then_eject() {
    let rig = connected_rig().await;
    let micr = MicrData {
        raw_data: "t011000015t 0001234567o".to_string(),
        account_number: "0001234567".to_string(),
        transit_number: "011000015".to_string(),
        ..MicrData::default()
    };
    rig.check.insert_check(micr.clone());

    let reader = rig.registry.check_reader().unwrap();
    assert_eq!(reader.insert_check().await.unwrap(), micr);
    reader.withdraw_check().await.unwrap();
    assert_eq!(rig.check.ejections(), 1);
}

#[tokio::test]
async fn test_power_cycle_disconnects_and_reconnects() {
    let rig = connected_rig().await;
    let printer = rig.registry.printer().unwrap();
    assert!(printer.is_connected());

    rig.printer.power(PowerState::Off).await.unwrap();
    eventually(|| !printer.is_connected()).await;
    assert_eq!(printer.health().health_status, HealthStatus::NotReady);

    rig.printer.power(PowerState::Online).await.unwrap();
    eventually(|| printer.is_connected()).await;
    assert_eq!(printer.health().health_status, HealthStatus::Ready);
    assert_eq!(rig.printer.call_count(MockOp::Open), 2);
}

#[tokio::test]
async fn test_reconnect_of_missing_device_is_offline() {
    let rig = connected_rig().await;
    rig.scale.set_attached(false);

    let error = rig
        .registry
        .reconnect(DeviceKind::Scale)
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::DeviceOffline);
    assert_eq!(error.http_status(), 404);
}

#[tokio::test(start_paused = true)]
async fn test_device_sequences_never_interleave() {
    let rig = connected_rig().await;
    let display = Arc::clone(rig.registry.line_display().unwrap());
    rig.display.set_enable_delay(Duration::from_secs(3));

    let reconnect = tokio::spawn({
        let display = Arc::clone(&display);
        async move { display.reconnect().await }
    });
    // Reopened and now stuck enabling.
    eventually(|| rig.display.call_count(MockOp::Open) == 2).await;

    let write = tokio::spawn({
        let display = Arc::clone(&display);
        async move { display.display(Some("Total"), Some("4.99")).await }
    });
    assert_eq!(display.connect().await, None);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!reconnect.is_finished());
    assert!(!write.is_finished());
    assert_eq!(rig.display.writes(), 0);

    reconnect.await.unwrap().unwrap();
    write.await.unwrap().unwrap();
    assert_eq!(rig.display.writes(), 2);
    assert_eq!(rig.display.rows()[0], "Total               ");
    assert_eq!(rig.display.call_count(MockOp::Open), 2);
}
