//! Check reader manager.

use crate::bridge::EventHandler;
use crate::health::HealthCache;
use crate::managed::ManagedDevice;
use crate::pending::PendingSlot;
use crate::timing::DeviceTiming;
use posgate_core::constants::{CHECK_DATA_TIMEOUT, CHECK_INSERTION_POLL, CHECK_REMOVAL_TIMEOUT};
use posgate_core::{ConnectionResult, DeviceError, HealthRecord, MicrData, Result};
use posgate_hardware::{AnyCheckReader, CheckReaderDriver, DataEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug)]
struct CheckEvents {
    pending: PendingSlot<MicrData>,
}

impl EventHandler for CheckEvents {
    fn on_data(&self, data: DataEvent) {
        if let DataEvent::Micr(micr) = data {
            self.pending.resolve(Ok(micr));
        }
    }

    fn on_error(&self, error: DeviceError) {
        self.pending.resolve(Err(error));
    }
}

/// Manager for the check reader.
///
/// [`insert_check`](Self::insert_check) waits for a check and returns its
/// MICR line; the check stays in the reader until
/// [`withdraw_check`](Self::withdraw_check) ejects it. Withdrawing also
/// abandons an insert that is still waiting.
///
/// # Examples
///
/// ```no_run
/// use posgate_devices::{CheckReaderManager, DeviceTiming, HealthCache};
/// use posgate_hardware::AnyCheckReader;
/// use posgate_hardware::mock::MockCheckReader;
///
/// # async fn example() -> posgate_core::Result<()> {
/// let (reader, _handle) = MockCheckReader::new("Check Reader");
/// let manager = CheckReaderManager::new(
///     AnyCheckReader::Mock(reader),
///     HealthCache::new(),
///     &DeviceTiming::default(),
/// );
/// manager.connect().await;
///
/// let micr = manager.insert_check().await?;
/// println!("account {}", micr.account_number);
/// manager.withdraw_check().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CheckReaderManager {
    device: ManagedDevice<AnyCheckReader>,
    events: Arc<CheckEvents>,
    active: Mutex<Option<CancellationToken>>,
    insertion_timeout: Duration,
}

impl CheckReaderManager {
    pub fn new(reader: AnyCheckReader, cache: HealthCache, timing: &DeviceTiming) -> Self {
        let events = Arc::new(CheckEvents {
            pending: PendingSlot::new(),
        });
        Self {
            device: ManagedDevice::new(reader, Arc::clone(&events), cache, timing),
            events,
            active: Mutex::new(None),
            insertion_timeout: timing.check_insertion_timeout,
        }
    }

    /// Configured device name.
    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    /// Whether an insert is waiting for a check or its MICR line.
    pub fn insertion_pending(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Scheduled connect.
    pub async fn connect(&self) -> Option<ConnectionResult> {
        self.device.connect().await
    }

    /// Manual reconnect.
    pub async fn reconnect(&self) -> Result<()> {
        self.device.reconnect().await
    }

    /// Wait for a check and read its MICR line.
    ///
    /// CLIENT_CANCELLED when no check arrives in time or the insert is
    /// withdrawn, TIMEOUT when the reader never reports the MICR line,
    /// DEVICE_BUSY when another insert is in flight.
    pub async fn insert_check(&self) -> Result<MicrData> {
        let cancel = {
            let mut active = self.lock_active();
            if active.is_some() {
                return Err(DeviceError::busy());
            }
            let cancel = CancellationToken::new();
            *active = Some(cancel.clone());
            cancel
        };

        let outcome = self.read_check(&cancel).await;
        self.lock_active().take();
        outcome
    }

    /// Abandon any insert in flight and eject the check.
    pub async fn withdraw_check(&self) -> Result<()> {
        if let Some(cancel) = self.lock_active().as_ref() {
            cancel.cancel();
        }
        if self.events.pending.cancel(DeviceError::cancelled()) {
            debug!(device = %self.name(), "Pending MICR read withdrawn");
        }

        let (_guard, mut reader) = self.device.command().await?;
        reader
            .begin_removal(CHECK_REMOVAL_TIMEOUT)
            .await
            .map_err(|e| self.device.map_error(&e))?;
        reader
            .end_removal()
            .await
            .map_err(|e| self.device.map_error(&e))?;
        info!(device = %self.name(), "Check withdrawn");
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

    async fn read_check(&self, cancel: &CancellationToken) -> Result<MicrData> {
        let (_guard, mut reader) = self.device.command().await?;
        let request = self.events.pending.register()?;
        let deadline = Instant::now() + self.insertion_timeout;
        info!(device = %self.name(), "Waiting for check");

        loop {
            if cancel.is_cancelled() {
                self.events.pending.clear();
                return Err(DeviceError::cancelled());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.events.pending.clear();
                info!(device = %self.name(), "No check inserted in time");
                return Err(DeviceError::cancelled());
            }

            match reader.begin_insertion(remaining.min(CHECK_INSERTION_POLL)).await {
                Ok(()) => break,
                Err(e) if e.is_timeout() => continue,
                Err(e) => {
                    self.events.pending.clear();
                    return Err(self.device.map_error(&e));
                }
            }
        }

        if let Err(e) = reader.end_insertion().await {
            self.events.pending.clear();
            return Err(self.device.map_error(&e));
        }
        drop(reader);

        let micr = request.wait(CHECK_DATA_TIMEOUT).await?;
        info!(device = %self.name(), "Check read");
        Ok(micr)
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posgate_core::{CheckType, ErrorCode};
    use posgate_hardware::codes;
    use posgate_hardware::mock::{MockCheckReader, MockCheckReaderHandle};

    fn micr() -> MicrData {
        MicrData {
            raw_data: "t021000021t 123456789o 0101".to_string(),
            account_number: "123456789".to_string(),
            bank_number: "0210".to_string(),
            transit_number: "021000021".to_string(),
            serial_number: "0101".to_string(),
            check_type: Some(CheckType::Personal),
            country_code: Some("US".to_string()),
        }
    }

    async fn connected() -> (Arc<CheckReaderManager>, MockCheckReaderHandle) {
        let (reader, handle) = MockCheckReader::new("Check Reader");
        let manager = Arc::new(CheckReaderManager::new(
            AnyCheckReader::Mock(reader),
            HealthCache::new(),
            &DeviceTiming::default(),
        ));
        assert_eq!(manager.connect().await, Some(ConnectionResult::Connected));
        (manager, handle)
    }

    async fn until_pending(manager: &CheckReaderManager) {
        while !manager.insertion_pending() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_inserted_check_is_read() {
        let (manager, handle) = connected().await;

        let read = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.insert_check().await }
        });
        until_pending(&manager).await;
        handle.insert_check(micr());

        assert_eq!(read.await.unwrap(), Ok(micr()));
        assert!(!manager.insertion_pending());
    }

    #[tokio::test]
    async fn test_unreadable_check_is_bad_data() {
        let (manager, handle) = connected().await;
        handle.insert_unreadable_check(codes::EMICR_BADDATA);

        let error = manager.insert_check().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::BadData);
        assert_eq!(error.http_status(), 400);
    }

    #[tokio::test]
    async fn test_second_insert_is_busy() {
        let (manager, _handle) = connected().await;

        let _first = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.insert_check().await }
        });
        until_pending(&manager).await;

        let error = manager.insert_check().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceBusy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_withdraw_cancels_waiting_insert() {
        let (manager, handle) = connected().await;

        let read = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.insert_check().await }
        });
        until_pending(&manager).await;
        manager.withdraw_check().await.unwrap();

        let error = read.await.unwrap().unwrap_err();
        assert_eq!(error.code, ErrorCode::ClientCancelled);
        assert_eq!(handle.ejections(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_ejects_read_check() {
        let (manager, handle) = connected().await;
        handle.insert_check(micr());
        manager.insert_check().await.unwrap();
        assert!(handle.has_check());

        manager.withdraw_check().await.unwrap();
        assert!(!handle.has_check());
        assert_eq!(handle.ejections(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_check_is_client_cancelled() {
        let (manager, _handle) = connected().await;
        let started = Instant::now();

        let error = manager.insert_check().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::ClientCancelled);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_offline_reader_rejects_insert() {
        let (reader, _handle) = MockCheckReader::new("Check Reader");
        let manager = CheckReaderManager::new(
            AnyCheckReader::Mock(reader),
            HealthCache::new(),
            &DeviceTiming::default(),
        );
        let error = manager.insert_check().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceOffline);
        assert!(!manager.insertion_pending());
    }
}
