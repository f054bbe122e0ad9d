//! Printer manager.

use crate::bridge::EventHandler;
use crate::health::HealthCache;
use crate::managed::ManagedDevice;
use crate::timing::DeviceTiming;
use posgate_core::{
    ConnectionResult, DeviceError, ErrorCode, HealthRecord, PrintItem, PrintJob, Result,
};
use posgate_hardware::{AnyPrinter, DataEvent, DeviceDriver, PrinterDriver};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Barcode height in dots when a job does not give one.
pub const DEFAULT_BARCODE_HEIGHT: u16 = 80;

/// Full cut.
const FULL_CUT: u8 = 100;

struct PrinterEvents {
    name: String,
}

impl EventHandler for PrinterEvents {
    fn on_data(&self, data: DataEvent) {
        debug!(device = %self.name, ?data, "Unexpected printer data");
    }

    fn on_error(&self, error: DeviceError) {
        warn!(device = %self.name, code = %error.code, "Printer reported an error");
    }
}

/// Manager for the receipt/slip printer.
///
/// A job runs under the device lock from its first item to its last, so two
/// jobs never interleave on paper.
#[derive(Debug)]
pub struct PrinterManager {
    device: ManagedDevice<AnyPrinter>,
}

impl PrinterManager {
    pub fn new(printer: AnyPrinter, cache: HealthCache, timing: &DeviceTiming) -> Self {
        let events = Arc::new(PrinterEvents {
            name: printer.name().to_string(),
        });
        Self {
            device: ManagedDevice::new(printer, events, cache, timing),
        }
    }

    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    /// Scheduled connect.
    pub async fn connect(&self) -> Option<ConnectionResult> {
        self.device.connect().await
    }

    /// Manual reconnect.
    pub async fn reconnect(&self) -> Result<()> {
        self.device.reconnect().await
    }

    /// Print `job` item by item on its station. An empty job is
    /// INVALID_FORMAT.
    pub async fn print(&self, job: &PrintJob) -> Result<()> {
        if job.items.is_empty() {
            return Err(DeviceError::with_description(
                ErrorCode::InvalidFormat,
                "Print job has no items",
            ));
        }

        let (_guard, mut printer) = self.device.command().await?;
        let station = job.station;
        let map = |e| self.device.map_error(&e);

        for item in &job.items {
            match item {
                PrintItem::Text { text } => printer.print_normal(station, text).await.map_err(map)?,
                PrintItem::Barcode { data, height } => printer
                    .print_barcode(station, data, height.unwrap_or(DEFAULT_BARCODE_HEIGHT))
                    .await
                    .map_err(map)?,
                PrintItem::Feed { lines } => {
                    let feed = "\n".repeat(usize::from(*lines));
                    printer.print_normal(station, &feed).await.map_err(map)?
                }
                PrintItem::Cut => printer.cut_paper(FULL_CUT).await.map_err(map)?,
            }
        }

        info!(device = %self.name(), ?station, items = job.items.len(), "Print job done");
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
