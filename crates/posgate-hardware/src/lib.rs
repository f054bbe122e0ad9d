//! Driver boundary for the POS peripheral gateway.
//!
//! This crate defines how the gateway talks to hardware: a lifecycle trait
//! every device shares ([`DeviceDriver`]) and one command trait per device
//! category. Drivers report asynchronous outcomes (scans, MICR lines, weight
//! samples, power transitions, errors) as [`DriverEvent`]s on a bounded
//! channel that the device layer consumes.
//!
//! # Device lifecycle
//!
//! ```no_run
//! use posgate_hardware::traits::{DeviceDriver, LineDisplayDriver};
//! use posgate_hardware::DriverResult;
//! use std::time::Duration;
//!
//! async fn greet<D: LineDisplayDriver>(display: &mut D) -> DriverResult<()> {
//!     display.open().await?;
//!     display.claim(Duration::from_secs(1)).await?;
//!     display.set_device_enabled(true).await?;
//!     display.clear_text().await?;
//!     display.display_text_at(0, 0, "WELCOME").await
//! }
//! ```
//!
//! # Error codes
//!
//! Drivers fail with a [`DriverError`] carrying the native result code and
//! extended code ([`codes`]). These never reach clients directly; the
//! [`mapping`] module turns them into a [`posgate_core::DeviceError`] using
//! per-category precedence rules.
//!
//! # Simulated devices
//!
//! The [`mock`] module provides a simulated implementation of every category.
//! The [`devices`] enums select an implementation at runtime.

pub mod codes;
pub mod devices;
pub mod error;
pub mod events;
pub mod mapping;
pub mod mock;
pub mod traits;

pub use devices::{AnyCheckReader, AnyLineDisplay, AnyPrinter, AnyScale, AnyScanner};
pub use error::{DriverError, DriverResult};
pub use events::{DataEvent, DriverEvent, ErrorEvent, PowerState, StatusUpdate};
pub use traits::{
    CheckReaderDriver, DeviceDriver, LineDisplayDriver, PrinterDriver, ScaleDriver, ScannerDriver,
};
