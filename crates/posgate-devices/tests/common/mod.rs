//! Shared fixtures for the device-layer integration tests.
//!
//! [`Rig`] wires one simulated device of every kind (two scanners) into a
//! [`DeviceRegistry`] and keeps the simulator handles so tests can play the
//! hardware's part.

#![allow(dead_code)]

use posgate_core::{DeviceKind, ScannerType};
use posgate_devices::DeviceRegistry;
use posgate_hardware::mock::{
    MockCheckReader, MockCheckReaderHandle, MockLineDisplay, MockLineDisplayHandle, MockPrinter,
    MockPrinterHandle, MockScale, MockScaleHandle, MockScanner, MockScannerHandle,
};
use posgate_hardware::{AnyCheckReader, AnyLineDisplay, AnyPrinter, AnyScale, AnyScanner};
use std::sync::Arc;
use std::time::Duration;

pub struct Rig {
    pub registry: Arc<DeviceRegistry>,
    pub flatbed: MockScannerHandle,
    pub handheld: MockScannerHandle,
    pub scale: MockScaleHandle,
    pub check: MockCheckReaderHandle,
    pub display: MockLineDisplayHandle,
    pub printer: MockPrinterHandle,
}

/// Build the rig without connecting anything.
pub fn rig() -> Rig {
    let (flatbed, flatbed_handle) = MockScanner::new("Flatbed", ScannerType::Flatbed);
    let (handheld, handheld_handle) = MockScanner::new("Handheld", ScannerType::Handheld);
    let (scale, scale_handle) = MockScale::new("Scale");
    let (check, check_handle) = MockCheckReader::new("Check Reader");
    let (display, display_handle) = MockLineDisplay::new("Line Display");
    let (printer, printer_handle) = MockPrinter::new("Printer");

    let registry = DeviceRegistry::builder()
        .scanner(AnyScanner::Mock(flatbed))
        .scanner(AnyScanner::Mock(handheld))
        .scale(AnyScale::Mock(scale))
        .check_reader(AnyCheckReader::Mock(check))
        .line_display(AnyLineDisplay::Mock(display))
        .printer(AnyPrinter::Mock(printer))
        .build();

    Rig {
        registry: Arc::new(registry),
        flatbed: flatbed_handle,
        handheld: handheld_handle,
        scale: scale_handle,
        check: check_handle,
        display: display_handle,
        printer: printer_handle,
    }
}

/// Build the rig and run one scheduled connect for every kind.
pub async fn connected_rig() -> Rig {
    let rig = rig();
    for kind in rig.registry.kinds() {
        rig.registry.connect(kind).await.unwrap();
    }
    rig
}

/// Poll `condition` until it holds. Sleeps between checks so paused-clock
/// tests keep advancing.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub const ALL_KINDS: [DeviceKind; 5] = [
    DeviceKind::Scanner,
    DeviceKind::Scale,
    DeviceKind::CheckReader,
    DeviceKind::LineDisplay,
    DeviceKind::Printer,
];
