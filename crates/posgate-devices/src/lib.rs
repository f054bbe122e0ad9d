//! Device layer of the POS peripheral gateway.
//!
//! Each physical device is owned by one [`DeviceSession`], guarded by one
//! [`ConnectionLock`] and fed by one [`EventBridge`] that turns driver
//! callbacks into domain events. On top of those sit the per-category
//! managers:
//!
//! - [`ScannerOrchestrator`] races the configured [`ScannerManager`]s for a
//!   barcode,
//! - [`ScaleManager`] streams live weight and serves stable-weight reads
//!   through a [`WeightStreamHub`],
//! - [`CheckReaderManager`], [`LineDisplayManager`] and [`PrinterManager`]
//!   run one command at a time under the device lock.
//!
//! A [`DeviceRegistry`] holds whatever subset of these is configured, and a
//! [`ReconnectScheduler`] keeps them connected in the background.
//!
//! # Example
//!
//! ```no_run
//! use posgate_core::ScannerType;
//! use posgate_devices::{DeviceRegistry, ReconnectScheduler};
//! use posgate_hardware::AnyScanner;
//! use posgate_hardware::mock::MockScanner;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let (scanner, _handle) = MockScanner::new("Flatbed", ScannerType::Flatbed);
//! let registry = Arc::new(
//!     DeviceRegistry::builder()
//!         .scanner(AnyScanner::Mock(scanner))
//!         .build(),
//! );
//! let scheduler = ReconnectScheduler::start(Arc::clone(&registry));
//! // ...
//! scheduler.shutdown().await;
//! # }
//! ```

pub mod bridge;
pub mod check;
pub mod display;
pub mod health;
pub mod lock;
pub mod managed;
pub mod orchestrator;
pub mod pending;
pub mod printer;
pub mod registry;
pub mod scale;
pub mod scanner;
pub mod scheduler;
pub mod session;
pub mod timing;
pub mod weight;

pub use bridge::{EventBridge, EventHandler};
pub use check::CheckReaderManager;
pub use display::LineDisplayManager;
pub use health::{HealthCache, HealthMonitor, HealthPhase};
pub use lock::{ConnectionGuard, ConnectionLock};
pub use managed::ManagedDevice;
pub use orchestrator::ScannerOrchestrator;
pub use pending::{PendingRequest, PendingSet, PendingSlot};
pub use printer::PrinterManager;
pub use registry::{DeviceRegistry, RegistryBuilder};
pub use scale::ScaleManager;
pub use scanner::ScannerManager;
pub use scheduler::ReconnectScheduler;
pub use session::{DeviceAccess, DeviceSession};
pub use timing::DeviceTiming;
pub use weight::{LiveWeightEvent, WeightStreamHub};
