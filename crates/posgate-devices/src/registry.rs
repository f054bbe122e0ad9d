//! The set of devices the gateway manages.
//!
//! A [`DeviceRegistry`] is built once at startup from the configured drivers
//! and shared (behind an `Arc`) with the scheduler and the HTTP layer. Every
//! category is optional; asking for one that is not configured fails with
//! DEVICE_OFFLINE.
//!
//! ```text
//!                       ┌──────────────────────┐
//!  ReconnectScheduler ─►│                      │──► ScannerOrchestrator ─► ScannerManager × n
//!   (connect per kind)  │    DeviceRegistry    │──► ScaleManager
//!                       │                      │──► CheckReaderManager
//!  HTTP handlers ──────►│  (shared HealthCache)│──► LineDisplayManager
//!   (commands, health)  │                      │──► PrinterManager
//!                       └──────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use posgate_core::DeviceKind;
//! use posgate_devices::DeviceRegistry;
//! use posgate_hardware::{AnyLineDisplay, AnyPrinter};
//! use posgate_hardware::mock::{MockLineDisplay, MockPrinter};
//!
//! # async fn example() -> posgate_core::Result<()> {
//! let (display, _display) = MockLineDisplay::new("Line Display");
//! let (printer, _printer) = MockPrinter::new("Printer");
//!
//! let registry = DeviceRegistry::builder()
//!     .line_display(AnyLineDisplay::Mock(display))
//!     .printer(AnyPrinter::Mock(printer))
//!     .build();
//!
//! for kind in registry.kinds() {
//!     registry.connect(kind).await?;
//! }
//! registry
//!     .line_display()?
//!     .display(Some("Welcome"), None)
//!     .await?;
//!
//! // No scale was configured.
//! assert!(registry.scale().is_err());
//! # Ok(())
//! # }
//! ```

use crate::check::CheckReaderManager;
use crate::display::LineDisplayManager;
use crate::health::HealthCache;
use crate::orchestrator::ScannerOrchestrator;
use crate::printer::PrinterManager;
use crate::scale::ScaleManager;
use crate::scanner::ScannerManager;
use crate::timing::DeviceTiming;
use posgate_core::{ConnectionResult, DeviceError, DeviceKind, HealthRecord, Result};
use posgate_hardware::{AnyCheckReader, AnyLineDisplay, AnyPrinter, AnyScale, AnyScanner};
use std::sync::Arc;
use tracing::{debug, info};

/// Every configured device manager.
#[derive(Debug)]
pub struct DeviceRegistry {
    scanners: Option<Arc<ScannerOrchestrator>>,
    scale: Option<Arc<ScaleManager>>,
    check: Option<Arc<CheckReaderManager>>,
    display: Option<Arc<LineDisplayManager>>,
    printer: Option<Arc<PrinterManager>>,
    cache: HealthCache,
    timing: DeviceTiming,
}

/// Collects drivers for a [`DeviceRegistry`].
///
/// Managers spawn their event bridges on construction, so
/// [`build`](RegistryBuilder::build) must run inside a Tokio runtime.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    timing: DeviceTiming,
    scanners: Vec<AnyScanner>,
    scale: Option<AnyScale>,
    check: Option<AnyCheckReader>,
    display: Option<AnyLineDisplay>,
    printer: Option<AnyPrinter>,
}

impl RegistryBuilder {
    /// Bounds handed to every manager. Defaults to [`DeviceTiming::default`].
    pub fn timing(mut self, timing: DeviceTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Add a scanner. Scanners race each other in registration order.
    pub fn scanner(mut self, scanner: AnyScanner) -> Self {
        self.scanners.push(scanner);
        self
    }

    pub fn scale(mut self, scale: AnyScale) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn check_reader(mut self, reader: AnyCheckReader) -> Self {
        self.check = Some(reader);
        self
    }

    pub fn line_display(mut self, display: AnyLineDisplay) -> Self {
        self.display = Some(display);
        self
    }

    pub fn printer(mut self, printer: AnyPrinter) -> Self {
        self.printer = Some(printer);
        self
    }

    pub fn build(self) -> DeviceRegistry {
        let cache = HealthCache::new();
        let timing = self.timing;

        let scanners = (!self.scanners.is_empty()).then(|| {
            let managers = self
                .scanners
                .into_iter()
                .map(|s| ScannerManager::new(s, cache.clone(), &timing))
                .collect();
            Arc::new(ScannerOrchestrator::new(managers, timing.scan_timeout))
        });

        let registry = DeviceRegistry {
            scanners,
            scale: self
                .scale
                .map(|s| Arc::new(ScaleManager::new(s, cache.clone(), &timing))),
            check: self
                .check
                .map(|c| Arc::new(CheckReaderManager::new(c, cache.clone(), &timing))),
            display: self
                .display
                .map(|d| Arc::new(LineDisplayManager::new(d, cache.clone(), &timing))),
            printer: self
                .printer
                .map(|p| Arc::new(PrinterManager::new(p, cache.clone(), &timing))),
            cache,
            timing,
        };
        info!(kinds = ?registry.kinds(), "Device registry built");
        registry
    }
}

impl DeviceRegistry {
    /// Start collecting drivers.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn timing(&self) -> &DeviceTiming {
        &self.timing
    }

    /// The cache every manager's health monitor writes to.
    pub fn health_cache(&self) -> &HealthCache {
        &self.cache
    }

    /// Configured device kinds.
    pub fn kinds(&self) -> Vec<DeviceKind> {
        [
            (DeviceKind::Scanner, self.scanners.is_some()),
            (DeviceKind::Scale, self.scale.is_some()),
            (DeviceKind::CheckReader, self.check.is_some()),
            (DeviceKind::LineDisplay, self.display.is_some()),
            (DeviceKind::Printer, self.printer.is_some()),
        ]
        .into_iter()
        .filter_map(|(kind, present)| present.then_some(kind))
        .collect()
    }

    /// The scanner orchestrator. DEVICE_OFFLINE when no scanner is
    /// configured; the same holds for every other category accessor.
    pub fn scanners(&self) -> Result<&Arc<ScannerOrchestrator>> {
        self.scanners.as_ref().ok_or_else(DeviceError::offline)
    }

    pub fn scale(&self) -> Result<&Arc<ScaleManager>> {
        self.scale.as_ref().ok_or_else(DeviceError::offline)
    }

    pub fn check_reader(&self) -> Result<&Arc<CheckReaderManager>> {
        self.check.as_ref().ok_or_else(DeviceError::offline)
    }

    pub fn line_display(&self) -> Result<&Arc<LineDisplayManager>> {
        self.display.as_ref().ok_or_else(DeviceError::offline)
    }

    pub fn printer(&self) -> Result<&Arc<PrinterManager>> {
        self.printer.as_ref().ok_or_else(DeviceError::offline)
    }

    /// Scheduled connect of every device of `kind`.
    ///
    /// Devices that refuse or whose lock is held are logged and retried on
    /// the next tick; only an unconfigured `kind` is an error.
    pub async fn connect(&self, kind: DeviceKind) -> Result<()> {
        let results = match kind {
            DeviceKind::Scanner => self.scanners()?.connect().await,
            DeviceKind::Scale => vec![self.scale()?.connect().await],
            DeviceKind::CheckReader => vec![self.check_reader()?.connect().await],
            DeviceKind::LineDisplay => vec![self.line_display()?.connect().await],
            DeviceKind::Printer => vec![self.printer()?.connect().await],
        };

        for result in results {
            match result {
                Some(ConnectionResult::NotConnected) => {
                    debug!(%kind, "Device not connected; retrying next tick")
                }
                None => debug!(%kind, "Device busy; connect skipped"),
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Manual reconnect of every device of `kind`.
    pub async fn reconnect(&self, kind: DeviceKind) -> Result<()> {
        match kind {
            DeviceKind::Scanner => self.scanners()?.reconnect_all().await,
            DeviceKind::Scale => self.scale()?.reconnect().await,
            DeviceKind::CheckReader => self.check_reader()?.reconnect().await,
            DeviceKind::LineDisplay => self.line_display()?.reconnect().await,
            DeviceKind::Printer => self.printer()?.reconnect().await,
        }
    }

    /// Live health of every device of `kind`.
    pub fn health(&self, kind: DeviceKind) -> Result<Vec<HealthRecord>> {
        Ok(match kind {
            DeviceKind::Scanner => self.scanners()?.health(),
            DeviceKind::Scale => vec![self.scale()?.health()],
            DeviceKind::CheckReader => vec![self.check_reader()?.health()],
            DeviceKind::LineDisplay => vec![self.line_display()?.health()],
            DeviceKind::Printer => vec![self.printer()?.health()],
        })
    }

    /// Cached health of every device of `kind`.
    pub fn status(&self, kind: DeviceKind) -> Result<Vec<HealthRecord>> {
        Ok(match kind {
            DeviceKind::Scanner => self.scanners()?.status(),
            DeviceKind::Scale => vec![self.scale()?.status()],
            DeviceKind::CheckReader => vec![self.check_reader()?.status()],
            DeviceKind::LineDisplay => vec![self.line_display()?.status()],
            DeviceKind::Printer => vec![self.printer()?.status()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posgate_core::{ErrorCode, HealthStatus, ScannerType};
    use posgate_hardware::mock::{MockLineDisplay, MockPrinter, MockScanner};

    #[tokio::test]
    async fn test_unconfigured_kind_is_offline() {
        let (display, _handle) = MockLineDisplay::new("Line Display");
        let registry = DeviceRegistry::builder()
            .line_display(AnyLineDisplay::Mock(display))
            .build();

        assert_eq!(registry.kinds(), vec![DeviceKind::LineDisplay]);
        let error = registry.reconnect(DeviceKind::Scale).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceOffline);
        assert!(registry.health(DeviceKind::Printer).is_err());
    }

    #[tokio::test]
    async fn test_connect_and_health_by_kind() {
        let (flatbed, _f) = MockScanner::new("Flatbed", ScannerType::Flatbed);
        let (handheld, _h) = MockScanner::new("Handheld", ScannerType::Handheld);
        let (printer, _p) = MockPrinter::new("Printer");
        let registry = DeviceRegistry::builder()
            .scanner(AnyScanner::Mock(flatbed))
            .scanner(AnyScanner::Mock(handheld))
            .printer(AnyPrinter::Mock(printer))
            .build();

        registry.connect(DeviceKind::Scanner).await.unwrap();
        let health = registry.health(DeviceKind::Scanner).unwrap();
        assert_eq!(health.len(), 2);
        assert!(health.iter().all(|r| r.health_status == HealthStatus::Ready));

        let printer = registry.status(DeviceKind::Printer).unwrap();
        assert_eq!(printer[0].health_status, HealthStatus::NotReady);

        // Health records share one cache.
        assert_eq!(registry.health_cache().snapshot().unwrap().len(), 3);
    }
}
