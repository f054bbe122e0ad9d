//! Scale manager: live weight and stable weight.

use crate::bridge::EventHandler;
use crate::health::HealthCache;
use crate::managed::ManagedDevice;
use crate::timing::DeviceTiming;
use crate::weight::{LiveWeightEvent, WeightStreamHub};
use posgate_core::constants::WEIGHT_READ_POLL;
use posgate_core::{
    ConnectionResult, ConnectionState, DeviceError, HealthRecord, LiveWeight, Result, Weight,
};
use posgate_hardware::{AnyScale, DataEvent, ScaleDriver, StatusUpdate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct ScaleEvents {
    hub: Arc<WeightStreamHub>,
}

impl EventHandler for ScaleEvents {
    fn on_status(&self, update: StatusUpdate) {
        if let StatusUpdate::Scale { status, weight } = update {
            self.hub
                .publish(LiveWeightEvent::Weight(LiveWeight::new(weight, status)));
        }
    }

    fn on_data(&self, data: DataEvent) {
        if let DataEvent::Weight(weight) = data {
            self.hub.resolve_stable(Ok(weight));
        }
    }

    fn on_error(&self, error: DeviceError) {
        self.hub.publish(LiveWeightEvent::Error(error.clone()));
        self.hub.resolve_stable(Err(error));
    }
}

/// Manager for the scale.
///
/// Two ways to read weight:
///
/// - [`live_weight`](Self::live_weight) subscribes to every sample the scale
///   reports, starting with the last known one;
/// - [`stable_weight`](Self::stable_weight) asks the scale for one settled
///   reading. Concurrent callers share a single read.
///
/// Live notification is re-armed on every connect edge, so a power cycle
/// does not silence subscribers.
///
/// # Examples
///
/// ```no_run
/// use posgate_devices::{DeviceTiming, HealthCache, LiveWeightEvent, ScaleManager};
/// use posgate_hardware::AnyScale;
/// use posgate_hardware::mock::MockScale;
///
/// # async fn example() -> posgate_core::Result<()> {
/// let (scale, _handle) = MockScale::new("Scale");
/// let manager = ScaleManager::new(
///     AnyScale::Mock(scale),
///     HealthCache::new(),
///     &DeviceTiming::default(),
/// );
/// manager.connect().await;
///
/// let mut samples = manager.live_weight();
/// while let Some(LiveWeightEvent::Weight(sample)) = samples.recv().await {
///     println!("{:?}", sample);
/// }
///
/// let weight = manager.stable_weight().await?;
/// println!("settled at {}", weight.formatted());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScaleManager {
    device: Arc<ManagedDevice<AnyScale>>,
    hub: Arc<WeightStreamHub>,
    stable_timeout: Duration,
    caller_timeout: Duration,
    notify_task: JoinHandle<()>,
}

impl ScaleManager {
    pub fn new(scale: AnyScale, cache: HealthCache, timing: &DeviceTiming) -> Self {
        let hub = Arc::new(WeightStreamHub::new());
        let events = Arc::new(ScaleEvents {
            hub: Arc::clone(&hub),
        });
        let device = Arc::new(ManagedDevice::new(scale, events, cache, timing));
        let edges = device.session().subscribe();
        let notify_task = tokio::spawn(arm_status_notify(Arc::clone(&device), edges));

        Self {
            device,
            hub,
            stable_timeout: timing.stable_weight_timeout,
            caller_timeout: timing.stable_weight_caller_timeout(),
            notify_task,
        }
    }

    /// Configured device name.
    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    pub fn hub(&self) -> &Arc<WeightStreamHub> {
        &self.hub
    }

    /// Scheduled connect.
    pub async fn connect(&self) -> Option<ConnectionResult> {
        self.device.connect().await
    }

    /// Manual reconnect.
    pub async fn reconnect(&self) -> Result<()> {
        self.device.reconnect().await
    }

    /// Subscribe to live weight.
    ///
    /// The receiver sees the last known sample first, if any. A subscriber
    /// that falls behind by a full channel is dropped; reconnect to resume.
    pub fn live_weight(&self) -> mpsc::Receiver<LiveWeightEvent> {
        self.hub.subscribe()
    }

    /// Read one stable weight.
    ///
    /// Concurrent callers share a single read and all receive its outcome.
    pub async fn stable_weight(&self) -> Result<Weight> {
        if !self.device.is_connected() {
            return Err(DeviceError::offline());
        }

        let outcome = self.hub.join_stable();
        if self.hub.start_read() {
            let device = Arc::clone(&self.device);
            let hub = Arc::clone(&self.hub);
            let limit = self.stable_timeout;
            tokio::spawn(async move {
                let result = read_stable(&device, &hub, limit).await;
                hub.finish_read(result);
            });
        }

        match tokio::time::timeout(self.caller_timeout, outcome).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DeviceError::unexpected()),
            Err(_) => {
                warn!(device = %self.name(), "Stable weight read hung past its bound");
                Err(DeviceError::timeout())
            }
        }
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

impl Drop for ScaleManager {
    fn drop(&mut self) {
        self.notify_task.abort();
    }
}

/// Turn on live-weight notification every time the scale connects.
async fn arm_status_notify(
    device: Arc<ManagedDevice<AnyScale>>,
    mut edges: broadcast::Receiver<posgate_core::ConnectionEvent>,
) {
    loop {
        match edges.recv().await {
            Ok(edge) if edge.state == ConnectionState::Connected => {
                let result = match device.session().access().await {
                    Ok(mut scale) => scale.set_status_notify(true).await,
                    Err(e) => {
                        debug!(device = %device.name(), error = %e, "Scale gone before notify");
                        continue;
                    }
                };
                match result {
                    Ok(()) => debug!(device = %device.name(), "Live weight notification on"),
                    Err(e) => warn!(device = %device.name(), error = %e, "Could not enable live weight"),
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

/// Poll the driver's bounded read until a weight, a device error or `limit`.
async fn read_stable(
    device: &ManagedDevice<AnyScale>,
    hub: &WeightStreamHub,
    limit: Duration,
) -> Result<Weight> {
    let (_guard, mut scale) = device.command().await?;
    let deadline = Instant::now() + limit;
    info!(device = %device.name(), "Stable weight read started");

    loop {
        if hub.pending_count() == 0 {
            debug!(device = %device.name(), "No one waiting; stopping stable read");
            return Err(DeviceError::cancelled());
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(DeviceError::timeout());
        }

        match scale.read_weight(remaining.min(WEIGHT_READ_POLL)).await {
            Ok(weight) => {
                info!(device = %device.name(), %weight, "Stable weight read");
                return Ok(weight);
            }
            Err(e) if e.is_timeout() => continue,
            Err(e) => return Err(device.map_error(&e)),
        }
    }
}
