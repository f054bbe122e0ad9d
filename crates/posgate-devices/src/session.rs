//! Connection lifecycle of one device.
//!
//! A [`DeviceSession`] exclusively owns a driver and walks it through
//! open, claim and enable on [`connect`](DeviceSession::connect), and back
//! through disable, release and close on
//! [`disconnect`](DeviceSession::disconnect). Both calls are idempotent.
//! Subscribers hear about a transition exactly once per edge; a reconnect of
//! an already-connected device is silent.
//!
//! ```text
//!              connect() ok
//! Disconnected ────────────► Connected ◄──┐
//!      ▲                        │         │ access dropped
//!      │ disconnect()           │ access()│
//!      │ or power loss          ▼         │
//!      └──────────────────── Busy ────────┘
//! ```

use posgate_core::constants::CONNECTION_EVENT_CAPACITY;
use posgate_core::{
    ConnectionEvent, ConnectionResult, ConnectionState, DeviceError, DeviceKind, Result,
};
use posgate_hardware::{DeviceDriver, DriverResult};
use std::ops::{Deref, DerefMut};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, broadcast};
use tracing::{debug, info, warn};

/// Connection lifecycle and exclusive driver access for one device.
#[derive(Debug)]
pub struct DeviceSession<D> {
    name: String,
    kind: DeviceKind,
    device: Mutex<D>,
    state: StdMutex<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
    claim_timeout: Duration,
}

impl<D: DeviceDriver> DeviceSession<D> {
    /// Wrap `device`. The session starts disconnected.
    pub fn new(device: D, claim_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(CONNECTION_EVENT_CAPACITY);
        Self {
            name: device.name().to_string(),
            kind: device.kind(),
            device: Mutex::new(device),
            state: StdMutex::new(ConnectionState::Disconnected),
            events,
            claim_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Current state. Authoritative, never cached.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribe to connection edges.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Open, claim and enable the device.
    ///
    /// Never fails: a driver refusal leaves the session disconnected and
    /// returns [`ConnectionResult::NotConnected`].
    pub async fn connect(&self) -> ConnectionResult {
        let mut device = self.device.lock().await;
        if self.is_connected() {
            return ConnectionResult::AlreadyConnected;
        }

        match bring_up(&mut *device, self.claim_timeout).await {
            Ok(()) => {
                self.transition(ConnectionState::Connected);
                info!(device = %self.name, kind = %self.kind, "Device connected");
                ConnectionResult::Connected
            }
            Err(e) => {
                warn!(device = %self.name, error = %e, "Device connect failed");
                if let Err(e) = device.release().await {
                    debug!(device = %self.name, error = %e, "Release after failed connect");
                }
                if let Err(e) = device.close().await {
                    debug!(device = %self.name, error = %e, "Close after failed connect");
                }
                ConnectionResult::NotConnected
            }
        }
    }

    /// Disable, release and close the device. No-op when disconnected.
    pub async fn disconnect(&self) {
        let mut device = self.device.lock().await;
        if !self.is_connected() {
            return;
        }

        if let Err(e) = device.set_device_enabled(false).await {
            warn!(device = %self.name, error = %e, "Disable failed during disconnect");
        }
        if let Err(e) = device.release().await {
            warn!(device = %self.name, error = %e, "Release failed during disconnect");
        }
        if let Err(e) = device.close().await {
            warn!(device = %self.name, error = %e, "Close failed during disconnect");
        }

        self.transition(ConnectionState::Disconnected);
        info!(device = %self.name, kind = %self.kind, "Device disconnected");
    }

    /// Exclusive access to the driver for a command.
    ///
    /// Fails with DEVICE_OFFLINE when the session is not connected. The
    /// session reads Busy until the returned access is dropped.
    pub async fn access(&self) -> Result<DeviceAccess<'_, D>> {
        let device = self.device.lock().await;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.is_connected() {
            return Err(DeviceError::offline());
        }
        *state = ConnectionState::Busy;
        drop(state);

        Ok(DeviceAccess {
            device,
            state: &self.state,
        })
    }

    fn transition(&self, next: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
        // No subscribers is fine.
        let _ = self.events.send(ConnectionEvent {
            device: self.name.clone(),
            state: next,
        });
    }
}

async fn bring_up<D: DeviceDriver>(device: &mut D, claim_timeout: Duration) -> DriverResult<()> {
    device.open().await?;
    device.claim(claim_timeout).await?;
    device.set_device_enabled(true).await
}

/// Exclusive driver access handed out by [`DeviceSession::access`].
#[derive(Debug)]
pub struct DeviceAccess<'a, D> {
    device: MutexGuard<'a, D>,
    state: &'a StdMutex<ConnectionState>,
}

impl<D> Deref for DeviceAccess<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.device
    }
}

impl<D> DerefMut for DeviceAccess<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D> Drop for DeviceAccess<'_, D> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == ConnectionState::Busy {
            *state = ConnectionState::Connected;
        }
    }
}
