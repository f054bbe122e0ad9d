//! Scan race across scanners.
//!
//! One scan request may be in flight at a time. The orchestrator enables
//! every scanner the request targets, returns the first label any of them
//! reads, and disables the losers before returning.

use crate::lock::ConnectionLock;
use crate::scanner::ScannerManager;
use posgate_core::{Barcode, ConnectionResult, DeviceError, HealthRecord, Result, ScanTarget};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Coordinator for every configured scanner.
///
/// ```text
/// get_data(Both) ──► JoinSet ──┬─► Flatbed.scan(token)  ─┐
///                              └─► Handheld.scan(token) ─┴─► first label wins,
///                                                            token cancels the rest
/// ```
#[derive(Debug)]
pub struct ScannerOrchestrator {
    scanners: Vec<Arc<ScannerManager>>,
    race: ConnectionLock,
    active: Mutex<Option<CancellationToken>>,
    scan_timeout: Duration,
}

impl ScannerOrchestrator {
    pub fn new(scanners: Vec<ScannerManager>, scan_timeout: Duration) -> Self {
        Self {
            scanners: scanners.into_iter().map(Arc::new).collect(),
            race: ConnectionLock::new("scanners", Duration::ZERO),
            active: Mutex::new(None),
            scan_timeout,
        }
    }

    /// Scanners in registration order.
    pub fn scanners(&self) -> &[Arc<ScannerManager>] {
        &self.scanners
    }

    /// Scheduled connect of every scanner.
    pub async fn connect(&self) -> Vec<Option<ConnectionResult>> {
        let mut results = Vec::with_capacity(self.scanners.len());
        for scanner in &self.scanners {
            results.push(scanner.connect().await);
        }
        results
    }

    /// Race the scanners selected by `target` for one label.
    ///
    /// DEVICE_BUSY when a scan is already in flight, DEVICE_OFFLINE when no
    /// selected scanner is connected, DISABLED when the request is cancelled
    /// and TIMEOUT when no label arrives in time.
    pub async fn get_data(&self, target: ScanTarget) -> Result<Barcode> {
        let Some(_guard) = self.race.try_lock_now() else {
            debug!(?target, "Scan already in flight");
            return Err(DeviceError::busy());
        };

        let candidates: Vec<_> = self
            .scanners
            .iter()
            .filter(|s| target.includes(s.scanner_type()) && s.is_connected())
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Err(DeviceError::offline());
        }

        let cancel = CancellationToken::new();
        *self.lock_active() = Some(cancel.clone());
        info!(?target, scanners = candidates.len(), "Scan started");

        let mut race = JoinSet::new();
        for scanner in candidates {
            let cancel = cancel.clone();
            race.spawn(async move { scanner.scan(cancel).await });
        }

        let outcome = match tokio::time::timeout(self.scan_timeout, first_label(&mut race)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout = ?self.scan_timeout, "Scan timed out");
                Err(DeviceError::timeout())
            }
        };

        // Losers see DISABLED and turn their scanners off.
        cancel.cancel();
        while race.join_next().await.is_some() {}
        self.lock_active().take();

        if let Ok(barcode) = &outcome {
            info!(scanner = %barcode.scanner, "Scan completed");
        }
        outcome
    }

    /// Cancel the scan in flight. ALREADY_DISABLED when there is none.
    pub fn cancel_scan_request(&self) -> Result<()> {
        match self.lock_active().as_ref() {
            Some(cancel) if !cancel.is_cancelled() => {
                info!("Scan cancelled by client");
                cancel.cancel();
                Ok(())
            }
            _ => Err(DeviceError::already_disabled()),
        }
    }

    /// Manual reconnect of every scanner, in parallel.
    pub async fn reconnect_all(&self) -> Result<()> {
        let mut tasks = JoinSet::new();
        for scanner in &self.scanners {
            let scanner = Arc::clone(scanner);
            tasks.spawn(async move { scanner.reconnect().await });
        }

        let mut first_error = None;
        while let Some(result) = tasks.join_next().await {
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => {
                    warn!(error = %e, "Scanner reconnect task failed");
                    DeviceError::unexpected()
                }
            };
            first_error.get_or_insert(error);
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Live health of every scanner.
    pub fn health(&self) -> Vec<HealthRecord> {
        self.scanners.iter().map(|s| s.health()).collect()
    }

    /// Cached health of every scanner.
    pub fn status(&self) -> Vec<HealthRecord> {
        self.scanners.iter().map(|s| s.status()).collect()
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// First label from the race; otherwise the first failure.
async fn first_label(race: &mut JoinSet<Result<Barcode>>) -> Result<Barcode> {
    let mut first_error = None;
    while let Some(result) = race.join_next().await {
        match result {
            Ok(Ok(barcode)) => return Ok(barcode),
            Ok(Err(e)) => {
                debug!(code = %e.code, "Scanner dropped out of race");
                first_error.get_or_insert(e);
            }
            Err(e) => {
                warn!(error = %e, "Scan task failed");
                first_error.get_or_insert(DeviceError::unexpected());
            }
        }
    }
    Err(first_error.unwrap_or_else(DeviceError::unexpected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthCache;
    use crate::timing::DeviceTiming;
    use posgate_core::{ErrorCode, ScannerType};
    use posgate_hardware::AnyScanner;
    use posgate_hardware::codes;
    use posgate_hardware::mock::{MockScanner, MockScannerHandle, SimulatorControl};

    fn orchestrator(timeout: Duration) -> (Arc<ScannerOrchestrator>, MockScannerHandle, MockScannerHandle) {
        let cache = HealthCache::new();
        let timing = DeviceTiming::default();
        let (flatbed, flatbed_handle) = MockScanner::new("Flatbed", ScannerType::Flatbed);
        let (handheld, handheld_handle) = MockScanner::new("Handheld", ScannerType::Handheld);
        let scanners = vec![
            ScannerManager::new(AnyScanner::Mock(flatbed), cache.clone(), &timing),
            ScannerManager::new(AnyScanner::Mock(handheld), cache, &timing),
        ];
        (
            Arc::new(ScannerOrchestrator::new(scanners, timeout)),
            flatbed_handle,
            handheld_handle,
        )
    }

    async fn until_armed(handle: &MockScannerHandle) {
        while !handle.is_armed() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_first_scanner_wins_and_losers_disable() {
        let (orchestrator, flatbed, handheld) = orchestrator(Duration::from_secs(60));
        orchestrator.connect().await;

        let scan = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.get_data(ScanTarget::Both).await }
        });
        until_armed(&flatbed).await;
        until_armed(&handheld).await;
        assert!(handheld.scan("HH-1", codes::SCAN_SDT_CODE128).await.unwrap());

        let barcode = scan.await.unwrap().unwrap();
        assert_eq!(barcode.scanner, "Handheld");
        assert!(!flatbed.is_enabled());
        assert!(!handheld.is_enabled());
    }

    #[tokio::test]
    async fn test_target_selects_scanners() {
        let (orchestrator, flatbed, handheld) = orchestrator(Duration::from_secs(60));
        orchestrator.connect().await;

        let scan = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.get_data(ScanTarget::Flatbed).await }
        });
        until_armed(&flatbed).await;
        assert!(!handheld.is_armed());
        assert!(flatbed.scan("FB-1", codes::SCAN_SDT_EAN8).await.unwrap());

        assert_eq!(scan.await.unwrap().unwrap().scanner, "Flatbed");
    }

    #[tokio::test]
    async fn test_concurrent_scan_is_busy() {
        let (orchestrator, flatbed, _handheld) = orchestrator(Duration::from_secs(60));
        orchestrator.connect().await;

        let scan = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.get_data(ScanTarget::Flatbed).await }
        });
        until_armed(&flatbed).await;

        let error = orchestrator.get_data(ScanTarget::Both).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceBusy);

        orchestrator.cancel_scan_request().unwrap();
        let error = scan.await.unwrap().unwrap_err();
        assert_eq!(error.code, ErrorCode::Disabled);
        assert!(!flatbed.is_enabled());
    }

    #[tokio::test]
    async fn test_cancel_without_scan_is_already_disabled() {
        let (orchestrator, _flatbed, _handheld) = orchestrator(Duration::from_secs(60));
        let error = orchestrator.cancel_scan_request().unwrap_err();
        assert_eq!(error.code, ErrorCode::AlreadyDisabled);
    }

    #[tokio::test]
    async fn test_no_connected_scanner_is_offline() {
        let (orchestrator, _flatbed, _handheld) = orchestrator(Duration::from_secs(60));
        let error = orchestrator.get_data(ScanTarget::Both).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceOffline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_times_out() {
        let (orchestrator, flatbed, handheld) = orchestrator(Duration::from_secs(60));
        orchestrator.connect().await;

        let error = orchestrator.get_data(ScanTarget::Both).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::Timeout);
        assert!(!flatbed.is_enabled());
        assert!(!handheld.is_enabled());
        // The race can run again afterwards.
        assert!(orchestrator.cancel_scan_request().is_err());
    }

    #[tokio::test]
    async fn test_reconnect_all_reports_offline_scanner() {
        let (orchestrator, flatbed, _handheld) = orchestrator(Duration::from_secs(60));
        orchestrator.connect().await;
        flatbed.set_attached(false);

        let error = orchestrator.reconnect_all().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceOffline);
        assert_eq!(
            orchestrator
                .status()
                .iter()
                .filter(|r| r.health_status == posgate_core::HealthStatus::Ready)
                .count(),
            1
        );
    }
}
