//! Callback consumer for one device.
//!
//! The bridge is the single consumer of a driver's event channel:
//!
//! - power transitions schedule `disconnect()` / `connect()` on the session
//!   in a spawned task, so the bridge never waits on the driver,
//! - data callbacks go to the manager's [`EventHandler::on_data`],
//! - error callbacks are mapped through the device kind's code tables and go
//!   to [`EventHandler::on_error`].

use crate::session::DeviceSession;
use posgate_core::DeviceError;
use posgate_hardware::mapping;
use posgate_hardware::{DataEvent, DeviceDriver, DriverEvent, PowerState, StatusUpdate};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Receiver of a device's domain events.
///
/// Calls are made from the bridge task and must not block.
pub trait EventHandler: Send + Sync + 'static {
    /// Status update other than a power transition.
    fn on_status(&self, update: StatusUpdate) {
        trace!(?update, "Ignoring status update");
    }

    /// Data callback.
    fn on_data(&self, data: DataEvent);

    /// Error callback, already mapped.
    fn on_error(&self, error: DeviceError);
}

/// Running bridge task. Stops when dropped.
#[derive(Debug)]
pub struct EventBridge {
    task: JoinHandle<()>,
}

impl EventBridge {
    /// Start consuming `events` for `session`.
    pub fn spawn<D, H>(
        session: Arc<DeviceSession<D>>,
        mut events: mpsc::Receiver<DriverEvent>,
        handler: Arc<H>,
    ) -> Self
    where
        D: DeviceDriver,
        H: EventHandler,
    {
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                dispatch(&session, handler.as_ref(), event);
            }
            debug!(device = %session.name(), "Event channel closed");
        });

        Self { task }
    }

    /// Whether the consumer task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn dispatch<D, H>(session: &Arc<DeviceSession<D>>, handler: &H, event: DriverEvent)
where
    D: DeviceDriver,
    H: EventHandler,
{
    trace!(device = %session.name(), ?event, "Driver event");
    match event {
        DriverEvent::Status(StatusUpdate::Power(power)) => schedule_power(session, power),
        DriverEvent::Status(update) => handler.on_status(update),
        DriverEvent::Data(data) => handler.on_data(data),
        DriverEvent::Error(error) => handler.on_error(mapping::map_event(session.kind(), &error)),
    }
}

fn schedule_power<D: DeviceDriver>(session: &Arc<DeviceSession<D>>, power: PowerState) {
    debug!(device = %session.name(), ?power, "Power transition");
    let session = Arc::clone(session);
    if power.is_offline() {
        tokio::spawn(async move { session.disconnect().await });
    } else {
        tokio::spawn(async move {
            session.connect().await;
        });
    }
}
