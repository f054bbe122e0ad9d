//! Simulated devices for development and testing.
//!
//! Every constructor returns a `(device, handle)` pair. The device half
//! implements the driver traits and is handed to a device session; the handle
//! half injects hardware-side happenings (a scan, a check, a power loss) and
//! inspects what the gateway did to the device. Callbacks produced by a
//! simulated device travel the same channel a real driver would use.

mod lifecycle;

pub mod check;
pub mod display;
pub mod printer;
pub mod scale;
pub mod scanner;

pub use lifecycle::{MockOp, SimulatorControl};
pub use check::{MockCheckReader, MockCheckReaderHandle};
pub use display::{MockLineDisplay, MockLineDisplayHandle};
pub use printer::{MockPrinter, MockPrinterHandle, PrintedOutput};
pub use scale::{MockScale, MockScaleHandle};
pub use scanner::{MockScanner, MockScannerHandle};
