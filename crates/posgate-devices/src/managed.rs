//! Building block shared by the device managers.
//!
//! A [`ManagedDevice`] composes a session, its connection lock, the event
//! bridge and a health monitor, and implements the parts of the manager
//! contract that do not depend on the device category: scheduled connect,
//! manual reconnect, live health and cached status.

use crate::bridge::{EventBridge, EventHandler};
use crate::health::{HealthCache, HealthMonitor};
use crate::lock::{ConnectionGuard, ConnectionLock};
use crate::session::{DeviceAccess, DeviceSession};
use crate::timing::DeviceTiming;
use posgate_core::{ConnectionResult, DeviceError, DeviceKind, HealthRecord, Result};
use posgate_hardware::{DeviceDriver, DriverError, mapping};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session, lock, bridge and health of one device.
#[derive(Debug)]
pub struct ManagedDevice<D> {
    session: Arc<DeviceSession<D>>,
    lock: ConnectionLock,
    health: HealthMonitor,
    _bridge: Option<EventBridge>,
}

impl<D: DeviceDriver> ManagedDevice<D> {
    /// Take ownership of `device` and start bridging its callbacks to
    /// `handler`.
    pub fn new<H: EventHandler>(
        mut device: D,
        handler: Arc<H>,
        cache: HealthCache,
        timing: &DeviceTiming,
    ) -> Self {
        let events = device.take_events();
        let name = device.name().to_string();
        let session = Arc::new(DeviceSession::new(device, timing.claim_timeout));

        let bridge = match events {
            Some(events) => Some(EventBridge::spawn(Arc::clone(&session), events, handler)),
            None => {
                warn!(device = %name, "Driver events already taken; callbacks will be ignored");
                None
            }
        };

        Self {
            lock: ConnectionLock::new(name.as_str(), timing.lock_timeout),
            health: HealthMonitor::new(name, cache, timing.health_max_age),
            session,
            _bridge: bridge,
        }
    }

    pub fn name(&self) -> &str {
        self.session.name()
    }

    pub fn kind(&self) -> DeviceKind {
        self.session.kind()
    }

    pub fn session(&self) -> &Arc<DeviceSession<D>> {
        &self.session
    }

    pub fn lock(&self) -> &ConnectionLock {
        &self.lock
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Scheduled connect. Skipped when the lock is held.
    pub async fn connect(&self) -> Option<ConnectionResult> {
        let Some(_guard) = self.lock.try_lock_now() else {
            debug!(device = %self.name(), "Device busy; skipping scheduled connect");
            return None;
        };

        let result = self.session.connect().await;
        self.health.connect_attempted();
        Some(result)
    }

    /// Manual reconnect: disconnect, then connect.
    ///
    /// DEVICE_BUSY when the lock cannot be taken in time, DEVICE_OFFLINE when
    /// the device does not come back.
    pub async fn reconnect(&self) -> Result<()> {
        let _guard = self.lock.lock_or_busy().await?;
        self.reconnect_locked().await
    }

    /// [`reconnect`](Self::reconnect) for a caller already holding the lock.
    pub async fn reconnect_locked(&self) -> Result<()> {
        info!(device = %self.name(), "Reconnecting device");
        self.session.disconnect().await;
        match self.session.connect().await {
            ConnectionResult::NotConnected => Err(DeviceError::offline()),
            _ => Ok(()),
        }
    }

    /// Take the lock, then exclusive driver access, for a command.
    pub async fn command(&self) -> Result<(ConnectionGuard, DeviceAccess<'_, D>)> {
        let guard = self.lock.lock_or_busy().await?;
        let access = self.session.access().await?;
        Ok((guard, access))
    }

    /// Map a driver failure for this device.
    pub fn map_error(&self, error: &DriverError) -> DeviceError {
        let mapped = mapping::map_error(self.kind(), error);
        warn!(device = %self.name(), error = %error, code = %mapped.code, "Device command failed");
        mapped
    }

    /// Live health.
    pub fn health(&self) -> HealthRecord {
        self.health.health(self.session.is_connected())
    }

    /// Cached health.
    pub fn status(&self) -> HealthRecord {
        self.health.status(|| self.session.is_connected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posgate_core::{ErrorCode, HealthStatus};
    use posgate_hardware::DataEvent;
    use posgate_hardware::mock::{MockLineDisplay, MockLineDisplayHandle, MockOp, SimulatorControl};

    struct Ignore;

    impl EventHandler for Ignore {
        fn on_data(&self, _data: DataEvent) {}
        fn on_error(&self, _error: DeviceError) {}
    }

    fn managed() -> (ManagedDevice<MockLineDisplay>, MockLineDisplayHandle) {
        let (display, handle) = MockLineDisplay::new("Line Display");
        let device = ManagedDevice::new(
            display,
            Arc::new(Ignore),
            HealthCache::new(),
            &DeviceTiming::default(),
        );
        (device, handle)
    }

    #[tokio::test]
    async fn test_scheduled_connect_skips_when_locked() {
        let (device, _handle) = managed();
        let guard = device.lock().try_lock_now().unwrap();
        assert_eq!(device.connect().await, None);
        drop(guard);
        assert_eq!(device.connect().await, Some(ConnectionResult::Connected));
        assert_eq!(device.connect().await, Some(ConnectionResult::AlreadyConnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_reports_busy_and_offline() {
        let (device, handle) = managed();

        let guard = device.lock().try_lock_now().unwrap();
        let error = device.reconnect().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceBusy);
        drop(guard);

        handle.set_attached(false);
        let error = device.reconnect().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceOffline);

        handle.set_attached(true);
        device.reconnect().await.unwrap();
        assert!(device.is_connected());
        assert_eq!(handle.call_count(MockOp::Open), 2);
    }

    #[tokio::test]
    async fn test_health_follows_connection() {
        let (device, _handle) = managed();
        assert_eq!(device.status().health_status, HealthStatus::NotReady);

        device.connect().await;
        // First scheduled connect finished: one live refresh is due.
        assert_eq!(device.status().health_status, HealthStatus::Ready);

        device.session().disconnect().await;
        assert_eq!(device.status().health_status, HealthStatus::Ready);
        assert_eq!(device.health().health_status, HealthStatus::NotReady);
        assert_eq!(device.status().health_status, HealthStatus::NotReady);
    }

    #[tokio::test]
    async fn test_command_requires_connection() {
        let (device, _handle) = managed();
        let error = device.command().await.unwrap_err();
        assert_eq!(error.code, ErrorCode::DeviceOffline);
        assert!(!device.lock().is_locked());

        device.connect().await;
        let (_guard, _access) = device.command().await.unwrap();
        assert!(device.lock().is_locked());
    }
}
