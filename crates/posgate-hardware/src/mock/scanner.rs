//! Simulated barcode scanner.

use super::lifecycle::{MockControl, MockCore, impl_simulator_control, lock};
use crate::DriverResult;
use crate::events::{DataEvent, DriverEvent};
use crate::traits::{DeviceDriver, ScannerDriver};
use bytes::Bytes;
use posgate_core::{DeviceKind, ScannerType};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
pub(crate) struct ScannerState {
    data_events_enabled: bool,
}

/// Simulated scanner.
///
/// Labels pushed through [`MockScannerHandle::scan`] reach the driver's event
/// channel only while the scanner is enabled with data events on, matching a
/// real scanner that ignores the trigger when disabled.
///
/// # Examples
///
/// ```
/// use posgate_core::ScannerType;
/// use posgate_hardware::mock::MockScanner;
///
/// let (scanner, handle) = MockScanner::new("Flatbed", ScannerType::Flatbed);
/// ```
#[derive(Debug)]
pub struct MockScanner {
    core: MockCore<ScannerState>,
    scanner_type: ScannerType,
}

impl MockScanner {
    /// Create a scanner and the handle that drives it.
    pub fn new(name: impl Into<String>, scanner_type: ScannerType) -> (Self, MockScannerHandle) {
        let (core, control) = MockCore::new(name, DeviceKind::Scanner);
        (Self { core, scanner_type }, MockScannerHandle { control })
    }
}

impl DeviceDriver for MockScanner {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> DeviceKind {
        self.core.kind
    }

    async fn open(&mut self) -> DriverResult<()> {
        self.core.open()
    }

    async fn claim(&mut self, _timeout: Duration) -> DriverResult<()> {
        self.core.claim()
    }

    async fn set_device_enabled(&mut self, enabled: bool) -> DriverResult<()> {
        self.core.set_device_enabled(enabled).await
    }

    async fn release(&mut self) -> DriverResult<()> {
        self.core.release()
    }

    async fn close(&mut self) -> DriverResult<()> {
        lock(&self.core.state).ext.data_events_enabled = false;
        self.core.close()
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        self.core.take_events()
    }
}

impl ScannerDriver for MockScanner {
    fn scanner_type(&self) -> ScannerType {
        self.scanner_type
    }

    async fn set_data_event_enabled(&mut self, enabled: bool) -> DriverResult<()> {
        lock(&self.core.state).ext.data_events_enabled = enabled;
        Ok(())
    }
}

/// Control handle for a [`MockScanner`].
#[derive(Debug, Clone)]
pub struct MockScannerHandle {
    control: MockControl<ScannerState>,
}

impl MockScannerHandle {
    /// Pull the trigger on `label`.
    ///
    /// Returns `false` when the scanner ignored the label because it is
    /// disabled or has data events off.
    pub async fn scan(&self, label: impl Into<Bytes>, data_type: i32) -> DriverResult<bool> {
        let deliver = {
            let state = lock(&self.control.state);
            state.enabled && state.ext.data_events_enabled
        };
        if !deliver {
            return Ok(false);
        }

        let event = DriverEvent::Data(DataEvent::Scan {
            label: label.into(),
            data_type,
        });
        self.control.send(event).await?;
        Ok(true)
    }

    /// Whether a pulled trigger would be delivered.
    pub fn is_armed(&self) -> bool {
        let state = lock(&self.control.state);
        state.enabled && state.ext.data_events_enabled
    }
}

impl_simulator_control!(MockScannerHandle);
