//! Enum wrappers for driver dispatch.
//!
//! The driver traits return `impl Future`, which makes them unusable as
//! `dyn` objects. Sessions and managers are instead generic over the driver
//! type, and the gateway picks implementations at runtime through the enums
//! below. Each enum forwards every trait call to the wrapped driver.
//!
//! # Examples
//!
//! ```
//! use posgate_core::ScannerType;
//! use posgate_hardware::devices::AnyScanner;
//! use posgate_hardware::mock::MockScanner;
//! use posgate_hardware::traits::{DeviceDriver, ScannerDriver};
//!
//! let (scanner, _handle) = MockScanner::new("Flatbed", ScannerType::Flatbed);
//! let scanner = AnyScanner::Mock(scanner);
//! assert_eq!(scanner.name(), "Flatbed");
//! assert_eq!(scanner.scanner_type(), ScannerType::Flatbed);
//! ```

use crate::DriverResult;
use crate::events::DriverEvent;
use crate::mock::{MockCheckReader, MockLineDisplay, MockPrinter, MockScale, MockScanner};
use crate::traits::{
    CheckReaderDriver, DeviceDriver, LineDisplayDriver, PrinterDriver, ScaleDriver, ScannerDriver,
};
use posgate_core::{DeviceKind, PrintStation, ScannerType, Weight};
use std::time::Duration;
use tokio::sync::mpsc;

/// Forward the [`DeviceDriver`] lifecycle to the wrapped driver.
macro_rules! forward_lifecycle {
    ($any:ident) => {
        impl DeviceDriver for $any {
            fn name(&self) -> &str {
                match self {
                    Self::Mock(device) => device.name(),
                }
            }

            fn kind(&self) -> DeviceKind {
                match self {
                    Self::Mock(device) => device.kind(),
                }
            }

            async fn open(&mut self) -> DriverResult<()> {
                match self {
                    Self::Mock(device) => device.open().await,
                }
            }

            async fn claim(&mut self, timeout: Duration) -> DriverResult<()> {
                match self {
                    Self::Mock(device) => device.claim(timeout).await,
                }
            }

            async fn set_device_enabled(&mut self, enabled: bool) -> DriverResult<()> {
                match self {
                    Self::Mock(device) => device.set_device_enabled(enabled).await,
                }
            }

            async fn release(&mut self) -> DriverResult<()> {
                match self {
                    Self::Mock(device) => device.release().await,
                }
            }

            async fn close(&mut self) -> DriverResult<()> {
                match self {
                    Self::Mock(device) => device.close().await,
                }
            }

            fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
                match self {
                    Self::Mock(device) => device.take_events(),
                }
            }
        }
    };
}

/// Any barcode scanner.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyScanner {
    /// Simulated scanner.
    Mock(MockScanner),
}

forward_lifecycle!(AnyScanner);

impl ScannerDriver for AnyScanner {
    fn scanner_type(&self) -> ScannerType {
        match self {
            Self::Mock(device) => device.scanner_type(),
        }
    }

    async fn set_data_event_enabled(&mut self, enabled: bool) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.set_data_event_enabled(enabled).await,
        }
    }
}

/// Any weighing scale.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyScale {
    /// Simulated scale.
    Mock(MockScale),
}

forward_lifecycle!(AnyScale);

impl ScaleDriver for AnyScale {
    async fn read_weight(&mut self, timeout: Duration) -> DriverResult<Weight> {
        match self {
            Self::Mock(device) => device.read_weight(timeout).await,
        }
    }

    async fn set_status_notify(&mut self, enabled: bool) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.set_status_notify(enabled).await,
        }
    }
}

/// Any check reader.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCheckReader {
    /// Simulated check reader.
    Mock(MockCheckReader),
}

forward_lifecycle!(AnyCheckReader);

impl CheckReaderDriver for AnyCheckReader {
    async fn begin_insertion(&mut self, timeout: Duration) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.begin_insertion(timeout).await,
        }
    }

    async fn end_insertion(&mut self) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.end_insertion().await,
        }
    }

    async fn begin_removal(&mut self, timeout: Duration) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.begin_removal(timeout).await,
        }
    }

    async fn end_removal(&mut self) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.end_removal().await,
        }
    }
}

/// Any line display.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyLineDisplay {
    /// Simulated line display.
    Mock(MockLineDisplay),
}

forward_lifecycle!(AnyLineDisplay);

impl LineDisplayDriver for AnyLineDisplay {
    async fn clear_text(&mut self) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.clear_text().await,
        }
    }

    async fn display_text_at(&mut self, row: u8, column: u8, text: &str) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.display_text_at(row, column, text).await,
        }
    }
}

/// Any printer.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyPrinter {
    /// Simulated printer.
    Mock(MockPrinter),
}

forward_lifecycle!(AnyPrinter);

impl PrinterDriver for AnyPrinter {
    async fn print_normal(&mut self, station: PrintStation, text: &str) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.print_normal(station, text).await,
        }
    }

    async fn print_barcode(
        &mut self,
        station: PrintStation,
        data: &str,
        height: u16,
    ) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.print_barcode(station, data, height).await,
        }
    }

    async fn cut_paper(&mut self, percentage: u8) -> DriverResult<()> {
        match self {
            Self::Mock(device) => device.cut_paper(percentage).await,
        }
    }
}
