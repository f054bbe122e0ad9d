//! Barcode scanner manager.
//!
//! A scanner idles claimed but disabled. A scan enables it with data events
//! on, waits for the label (or an error, or cancellation) and always disables
//! it again before returning.
//!
//! Handheld scanners are known to wedge: when enabling one fails or takes
//! longer than [`HANDHELD_HEALTHY_ENABLE`], the manager cycles the connection
//! and enables again, up to [`HANDHELD_RECOVERY_ATTEMPTS`] times.

use crate::bridge::EventHandler;
use crate::health::HealthCache;
use crate::managed::ManagedDevice;
use crate::pending::PendingSlot;
use crate::timing::DeviceTiming;
use chrono::Utc;
use posgate_core::constants::{HANDHELD_HEALTHY_ENABLE, HANDHELD_RECOVERY_ATTEMPTS};
use posgate_core::{
    Barcode, ConnectionEvent, ConnectionResult, ConnectionState, DeviceError, HealthRecord,
    Result, ScannerType,
};
use posgate_hardware::mapping;
use posgate_hardware::{AnyScanner, DataEvent, DeviceDriver, DriverResult, ScannerDriver};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct ScannerEvents {
    name: String,
    pending: PendingSlot<Barcode>,
}

impl EventHandler for ScannerEvents {
    fn on_data(&self, data: DataEvent) {
        let DataEvent::Scan { label, data_type } = data else {
            debug!(device = %self.name, ?data, "Ignoring non-scan data");
            return;
        };

        let barcode = Barcode {
            data: String::from_utf8_lossy(&label).into_owned(),
            symbology: mapping::symbology(data_type),
            scanner: self.name.clone(),
            scanned_at: Utc::now(),
        };
        debug!(device = %self.name, data = %barcode.data, "Label scanned");
        if !self.pending.resolve(Ok(barcode)) {
            debug!(device = %self.name, "Scan arrived with no request waiting");
        }
    }

    fn on_error(&self, error: DeviceError) {
        self.pending.resolve(Err(error));
    }
}

/// Manager for one barcode scanner.
///
/// Owns the scanner's session and keeps it idle: disabled with data events
/// off whenever it connects, whether through [`connect`](Self::connect),
/// [`reconnect`](Self::reconnect) or a power-online callback. Only
/// [`scan`](Self::scan) enables it, and only for as long as the scan runs.
///
/// Usually driven through a
/// [`ScannerOrchestrator`](crate::ScannerOrchestrator) rather than directly.
///
/// # Examples
///
/// ```no_run
/// use posgate_core::ScannerType;
/// use posgate_devices::{DeviceTiming, HealthCache, ScannerManager};
/// use posgate_hardware::AnyScanner;
/// use posgate_hardware::mock::MockScanner;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> posgate_core::Result<()> {
/// let (scanner, _handle) = MockScanner::new("Handheld", ScannerType::Handheld);
/// let manager = ScannerManager::new(
///     AnyScanner::Mock(scanner),
///     HealthCache::new(),
///     &DeviceTiming::default(),
/// );
///
/// manager.connect().await;
/// let barcode = manager.scan(CancellationToken::new()).await?;
/// println!("{} read {}", barcode.scanner, barcode.data);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScannerManager {
    device: Arc<ManagedDevice<AnyScanner>>,
    events: Arc<ScannerEvents>,
    scanner_type: ScannerType,
    idle_task: JoinHandle<()>,
}

impl std::fmt::Debug for ScannerEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerEvents")
            .field("name", &self.name)
            .field("pending", &self.pending)
            .finish()
    }
}

impl ScannerManager {
    /// Take ownership of `scanner`. Spawns the event bridge and the idle
    /// watcher, so this must run inside a Tokio runtime.
    pub fn new(scanner: AnyScanner, cache: HealthCache, timing: &DeviceTiming) -> Self {
        let scanner_type = scanner.scanner_type();
        let events = Arc::new(ScannerEvents {
            name: scanner.name().to_string(),
            pending: PendingSlot::new(),
        });
        let device = Arc::new(ManagedDevice::new(
            scanner,
            Arc::clone(&events),
            cache,
            timing,
        ));
        let edges = device.session().subscribe();
        let idle_task = tokio::spawn(idle_on_connect(
            Arc::clone(&device),
            Arc::clone(&events),
            edges,
        ));

        Self {
            device,
            events,
            scanner_type,
            idle_task,
        }
    }

    /// Configured device name, as reported in health records and barcodes.
    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn scanner_type(&self) -> ScannerType {
        self.scanner_type
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    /// Scheduled connect, then idle.
    ///
    /// `None` when a scan or reconnect holds the lock; the attempt is
    /// simply skipped.
    pub async fn connect(&self) -> Option<ConnectionResult> {
        let result = self.device.connect().await;
        if result == Some(ConnectionResult::Connected) {
            // Idle disabled until a scan asks for data.
            if let Err(e) = self.disable().await {
                warn!(device = %self.name(), error = %e, "Could not idle scanner after connect");
            }
        }
        result
    }

    /// Manual reconnect: cycle the session and leave the scanner idle.
    ///
    /// DEVICE_BUSY while a scan holds the lock, DEVICE_OFFLINE when the
    /// scanner does not come back.
    pub async fn reconnect(&self) -> Result<()> {
        self.device.reconnect().await?;
        self.disable().await
    }

    /// Wait for one label.
    ///
    /// Fails with DISABLED when `cancel` fires first. The caller bounds the
    /// overall wait.
    pub async fn scan(&self, cancel: CancellationToken) -> Result<Barcode> {
        let _guard = self.device.lock().lock_or_busy().await?;
        if !self.device.is_connected() {
            return Err(DeviceError::offline());
        }

        let request = self.events.pending.register()?;
        if let Err(e) = self.enable().await {
            self.events.pending.clear();
            let _ = self.disable().await;
            return Err(e);
        }

        let outcome = tokio::select! {
            outcome = request.wait(Duration::MAX) => outcome,
            () = cancel.cancelled() => Err(DeviceError::disabled()),
        };

        self.events.pending.clear();
        if let Err(e) = self.disable().await {
            warn!(device = %self.name(), error = %e, "Could not disable scanner after scan");
        }
        outcome
    }

    /// Live health.
    pub fn health(&self) -> HealthRecord {
        self.device.health()
    }

    /// Cached health.
    pub fn status(&self) -> HealthRecord {
        self.device.status()
    }

    async fn enable(&self) -> Result<()> {
        let started = Instant::now();
        let first = self.enable_once().await;
        if self.scanner_type != ScannerType::Handheld {
            return first;
        }
        if first.is_ok() && started.elapsed() < HANDHELD_HEALTHY_ENABLE {
            return first;
        }

        warn!(
            device = %self.name(),
            elapsed = ?started.elapsed(),
            failed = first.is_err(),
            "Handheld enable unhealthy; recovering"
        );

        let mut last = first;
        for attempt in 1..=HANDHELD_RECOVERY_ATTEMPTS {
            let session = self.device.session();
            session.disconnect().await;
            if session.connect().await == ConnectionResult::NotConnected {
                last = Err(DeviceError::offline());
                continue;
            }

            let started = Instant::now();
            last = self.enable_once().await;
            if last.is_ok() && started.elapsed() < HANDHELD_HEALTHY_ENABLE {
                info!(device = %self.name(), attempt, "Handheld recovered");
                break;
            }
        }
        last
    }

    async fn enable_once(&self) -> Result<()> {
        let mut scanner = self.device.session().access().await?;
        scanner
            .set_device_enabled(true)
            .await
            .map_err(|e| self.device.map_error(&e))?;
        scanner
            .set_data_event_enabled(true)
            .await
            .map_err(|e| self.device.map_error(&e))
    }

    async fn disable(&self) -> Result<()> {
        let mut scanner = self.device.session().access().await?;
        idle(&mut scanner).await.map_err(|e| self.device.map_error(&e))
    }
}

impl Drop for ScannerManager {
    fn drop(&mut self) {
        self.idle_task.abort();
    }
}

async fn idle(scanner: &mut AnyScanner) -> DriverResult<()> {
    scanner.set_data_event_enabled(false).await?;
    scanner.set_device_enabled(false).await
}

/// Disable the scanner on every connect edge, including the ones a power
/// callback produces, unless a scan owns the device.
async fn idle_on_connect(
    device: Arc<ManagedDevice<AnyScanner>>,
    events: Arc<ScannerEvents>,
    mut edges: broadcast::Receiver<ConnectionEvent>,
) {
    loop {
        match edges.recv().await {
            Ok(edge) if edge.state == ConnectionState::Connected => {
                let mut scanner = match device.session().access().await {
                    Ok(scanner) => scanner,
                    Err(e) => {
                        debug!(device = %device.name(), error = %e, "Scanner gone before idle");
                        continue;
                    }
                };
                // Checked under access so a scan cannot enable in between.
                if events.pending.is_pending() {
                    continue;
                }
                match idle(&mut scanner).await {
                    Ok(()) => debug!(device = %device.name(), "Scanner idle"),
                    Err(e) => warn!(device = %device.name(), error = %e, "Could not idle scanner"),
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(device = %device.name(), skipped, "Missed connection edges");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
