//! Device-driver boundary.
//!
//! These traits describe the standardized, event-driven driver interface the
//! gateway talks to. A device must be opened, claimed and enabled before it
//! produces events, and disabled, released and closed when the application is
//! done with it. Command results that the hardware produces later arrive as
//! [`DriverEvent`]s on the channel returned by [`DeviceDriver::take_events`].
//!
//! Methods return `impl Future + Send` so that generic code can move driver
//! calls onto Tokio tasks. Implementations may still use `async fn`.
//!
//! For runtime selection between implementations, use the enum wrappers in
//! [`crate::devices`].

use crate::error::DriverResult;
use crate::events::DriverEvent;
use posgate_core::{DeviceKind, PrintStation, ScannerType, Weight};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

/// Lifecycle shared by every device category.
pub trait DeviceDriver: Send + 'static {
    /// Logical device name (unique within the gateway).
    fn name(&self) -> &str;

    /// Device category.
    fn kind(&self) -> DeviceKind;

    /// Open the device; no exclusive access yet.
    fn open(&mut self) -> impl Future<Output = DriverResult<()>> + Send;

    /// Take exclusive access, waiting at most `timeout` for it.
    fn claim(&mut self, timeout: Duration) -> impl Future<Output = DriverResult<()>> + Send;

    /// Enable or disable event generation.
    fn set_device_enabled(&mut self, enabled: bool)
    -> impl Future<Output = DriverResult<()>> + Send;

    /// Give up exclusive access.
    fn release(&mut self) -> impl Future<Output = DriverResult<()>> + Send;

    /// Close the device.
    fn close(&mut self) -> impl Future<Output = DriverResult<()>> + Send;

    /// Hand over the callback channel. Returns `None` after the first call.
    fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>>;
}

/// Barcode scanner.
///
/// Labels arrive as [`crate::events::DataEvent::Scan`] while the device is
/// enabled and data events are enabled.
pub trait ScannerDriver: DeviceDriver {
    /// Physical form of the scanner.
    fn scanner_type(&self) -> ScannerType;

    /// Allow or suppress delivery of data events.
    fn set_data_event_enabled(&mut self, enabled: bool)
    -> impl Future<Output = DriverResult<()>> + Send;
}

/// Weighing scale.
///
/// Live samples arrive as [`crate::events::StatusUpdate::Scale`] while status
/// notification is enabled.
pub trait ScaleDriver: DeviceDriver {
    /// Read a stable weight, waiting at most `timeout`. A plain timeout is
    /// reported as [`crate::codes::E_TIMEOUT`].
    fn read_weight(&mut self, timeout: Duration) -> impl Future<Output = DriverResult<Weight>> + Send;

    /// Enable or disable live-weight status notification.
    fn set_status_notify(&mut self, enabled: bool) -> impl Future<Output = DriverResult<()>> + Send;
}

/// Check (MICR) reader.
///
/// The MICR line arrives as [`crate::events::DataEvent::Micr`] after
/// [`end_insertion`](CheckReaderDriver::end_insertion).
pub trait CheckReaderDriver: DeviceDriver {
    /// Wait at most `timeout` for a check to be inserted.
    fn begin_insertion(&mut self, timeout: Duration) -> impl Future<Output = DriverResult<()>> + Send;

    /// Finish insertion and start reading.
    fn end_insertion(&mut self) -> impl Future<Output = DriverResult<()>> + Send;

    /// Eject the check, waiting at most `timeout`.
    fn begin_removal(&mut self, timeout: Duration) -> impl Future<Output = DriverResult<()>> + Send;

    /// Finish removal.
    fn end_removal(&mut self) -> impl Future<Output = DriverResult<()>> + Send;
}

/// Customer-facing line display.
pub trait LineDisplayDriver: DeviceDriver {
    /// Blank every row.
    fn clear_text(&mut self) -> impl Future<Output = DriverResult<()>> + Send;

    /// Write `text` starting at `row`/`column`.
    fn display_text_at(
        &mut self,
        row: u8,
        column: u8,
        text: &str,
    ) -> impl Future<Output = DriverResult<()>> + Send;
}

/// Receipt / slip printer.
pub trait PrinterDriver: DeviceDriver {
    /// Print text on `station`.
    fn print_normal(
        &mut self,
        station: PrintStation,
        text: &str,
    ) -> impl Future<Output = DriverResult<()>> + Send;

    /// Print a barcode on `station`.
    fn print_barcode(
        &mut self,
        station: PrintStation,
        data: &str,
        height: u16,
    ) -> impl Future<Output = DriverResult<()>> + Send;

    /// Cut the receipt; `percentage` of 100 is a full cut.
    fn cut_paper(&mut self, percentage: u8) -> impl Future<Output = DriverResult<()>> + Send;
}
