//! Line display manager.

use crate::bridge::EventHandler;
use crate::health::HealthCache;
use crate::managed::ManagedDevice;
use crate::timing::DeviceTiming;
use posgate_core::{ConnectionResult, DeviceError, HealthRecord, Result, fit_display_line};
use posgate_hardware::{AnyLineDisplay, DataEvent, DeviceDriver, LineDisplayDriver};
use std::sync::Arc;
use tracing::{debug, warn};

struct DisplayEvents {
    name: String,
}

impl EventHandler for DisplayEvents {
    fn on_data(&self, data: DataEvent) {
        debug!(device = %self.name, ?data, "Unexpected display data");
    }

    fn on_error(&self, error: DeviceError) {
        warn!(device = %self.name, code = %error.code, "Line display reported an error");
    }
}

/// Manager for the customer-facing line display.
#[derive(Debug)]
pub struct LineDisplayManager {
    device: ManagedDevice<AnyLineDisplay>,
}

impl LineDisplayManager {
    pub fn new(display: AnyLineDisplay, cache: HealthCache, timing: &DeviceTiming) -> Self {
        let events = Arc::new(DisplayEvents {
            name: display.name().to_string(),
        });
        Self {
            device: ManagedDevice::new(display, events, cache, timing),
        }
    }

    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    /// Scheduled connect. `None` when a command or reconnect holds the lock.
    pub async fn connect(&self) -> Option<ConnectionResult> {
        self.device.connect().await
    }

    /// Manual reconnect.
    pub async fn reconnect(&self) -> Result<()> {
        self.device.reconnect().await
    }

    /// Show two lines. Each is padded or cut to the display width; a missing
    /// line is blank.
    pub async fn display(&self, line1: Option<&str>, line2: Option<&str>) -> Result<()> {
        let rows = [fit_display_line(line1), fit_display_line(line2)];
        let (_guard, mut display) = self.device.command().await?;

        display
            .clear_text()
            .await
            .map_err(|e| self.device.map_error(&e))?;
        for (row, text) in (0u8..).zip(&rows) {
            display
                .display_text_at(row, 0, text)
                .await
                .map_err(|e| self.device.map_error(&e))?;
        }
        debug!(device = %self.name(), line1 = %rows[0], line2 = %rows[1], "Display updated");
        Ok(())
    }

    /// Live health.
    pub fn health(&self) -> HealthRecord {
        self.device.health()
    }

    /// Cached health.
    pub fn status(&self) -> HealthRecord {
        self.device.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posgate_core::ErrorCode;
    use posgate_hardware::DriverError;
    use posgate_hardware::codes;
    use posgate_hardware::mock::{MockLineDisplay, MockLineDisplayHandle, MockOp, SimulatorControl};
    use rstest::rstest;

    async fn connected() -> (LineDisplayManager, MockLineDisplayHandle) {
        let (display, handle) = MockLineDisplay::new("Line Display");
        let manager = LineDisplayManager::new(
            AnyLineDisplay::Mock(display),
            HealthCache::new(),
            &DeviceTiming::default(),
        );
        manager.connect().await;
        (manager, handle)
    }

    #[rstest]
    #[case(Some("Hi"), None, ["Hi                  ", "                    "])]
    #[case(Some("Total"), Some("4.99"), ["Total               ", "4.99                "])]
    #[case(None, Some("THANK YOU FOR SHOPPING"), ["                    ", "THANK YOU FOR SHOPPI"])]
    #[tokio::test]
    async fn test_display_writes_fitted_rows(
        #[case] line1: Option<&str>,
        #[case] line2: Option<&str>,
        #[case] expected: [&str; 2],
    ) {
        let (manager, handle) = connected().await;
        manager.display(line1, line2).await.unwrap();
        assert_eq!(handle.rows(), expected);
        assert_eq!(handle.writes(), 2);
    }

    #[tokio::test]
    async fn test_display_replaces_previous_text() {
        let (manager, handle) = connected().await;
        manager.display(Some("A long first message"), Some("second")).await.unwrap();
        manager.display(Some("Hi"), None).await.unwrap();
        assert_eq!(handle.rows(), ["Hi                  ", "                    "]);
    }

    #[tokio::test]
    async fn test_display_offline() {
        let (display, _handle) = MockLineDisplay::new("Line Display");
        let manager = LineDisplayManager::new(
            AnyLineDisplay::Mock(display),
            HealthCache::new(),
            &DeviceTiming::default(),
        );
        let error = manager.display(Some("Hi"), None).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceOffline);
    }

    #[tokio::test]
    async fn test_driver_failure_is_mapped() {
        let (manager, handle) = connected().await;
        handle.fail_next(MockOp::Command, DriverError::new(codes::E_BUSY, "busy"));
        let error = manager.display(Some("Hi"), None).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceBusy);
    }
}
