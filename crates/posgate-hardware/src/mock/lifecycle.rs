//! Lifecycle state shared by every simulated device.
//!
//! A simulated device is split in two halves, like the physical setup it
//! stands in for: the driver half ([`MockCore`]) is owned by the device
//! session, and the control half ([`MockControl`]) is held by tests or the
//! simulator control surface. Both halves share one [`MockState`].

use crate::DriverResult;
use crate::error::DriverError;
use crate::events::{DriverEvent, ErrorEvent, PowerState, StatusUpdate};
use posgate_core::DeviceKind;
use posgate_core::constants::EVENT_CHANNEL_CAPACITY;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Driver call that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Open,
    Claim,
    Enable,
    Disable,
    Release,
    Close,
    /// Any category-specific command.
    Command,
}

/// State shared between the driver half and the control half.
#[derive(Debug)]
pub(crate) struct MockState<X> {
    pub attached: bool,
    pub opened: bool,
    pub claimed: bool,
    pub enabled: bool,
    pub enable_delay: Duration,
    pub failures: HashMap<MockOp, VecDeque<DriverError>>,
    pub calls: HashMap<MockOp, usize>,
    /// Category-specific state.
    pub ext: X,
}

impl<X: Default> Default for MockState<X> {
    fn default() -> Self {
        Self {
            attached: true,
            opened: false,
            claimed: false,
            enabled: false,
            enable_delay: Duration::ZERO,
            failures: HashMap::new(),
            calls: HashMap::new(),
            ext: X::default(),
        }
    }
}

impl<X> MockState<X> {
    /// Count the call and pop a scripted failure, if any.
    fn record(&mut self, op: MockOp) -> DriverResult<()> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

pub(crate) type Shared<X> = Arc<Mutex<MockState<X>>>;

pub(crate) fn lock<X>(state: &Shared<X>) -> MutexGuard<'_, MockState<X>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Driver half of a simulated device.
#[derive(Debug)]
pub(crate) struct MockCore<X> {
    pub name: String,
    pub kind: DeviceKind,
    pub state: Shared<X>,
    pub notify: Arc<Notify>,
    pub event_tx: mpsc::Sender<DriverEvent>,
    event_rx: Option<mpsc::Receiver<DriverEvent>>,
}

impl<X: Default + Send + 'static> MockCore<X> {
    pub fn new(name: impl Into<String>, kind: DeviceKind) -> (Self, MockControl<X>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let name = name.into();
        let state: Shared<X> = Arc::new(Mutex::new(MockState::default()));
        let notify = Arc::new(Notify::new());

        let control = MockControl {
            name: name.clone(),
            state: Arc::clone(&state),
            notify: Arc::clone(&notify),
            event_tx: event_tx.clone(),
        };

        let core = Self {
            name,
            kind,
            state,
            notify,
            event_tx,
            event_rx: Some(event_rx),
        };

        (core, control)
    }

    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        self.event_rx.take()
    }

    pub fn open(&self) -> DriverResult<()> {
        let mut state = lock(&self.state);
        state.record(MockOp::Open)?;
        if !state.attached {
            return Err(DriverError::no_hardware(&self.name));
        }
        state.opened = true;
        Ok(())
    }

    pub fn claim(&self) -> DriverResult<()> {
        let mut state = lock(&self.state);
        state.record(MockOp::Claim)?;
        if !state.opened {
            return Err(DriverError::closed(&self.name));
        }
        if !state.attached {
            return Err(DriverError::no_hardware(&self.name));
        }
        state.claimed = true;
        Ok(())
    }

    pub async fn set_device_enabled(&self, enabled: bool) -> DriverResult<()> {
        let delay = {
            let mut state = lock(&self.state);
            let op = if enabled { MockOp::Enable } else { MockOp::Disable };
            state.record(op)?;
            if !state.claimed {
                return Err(DriverError::not_claimed(&self.name));
            }
            if enabled { state.enable_delay } else { Duration::ZERO }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        lock(&self.state).enabled = enabled;
        Ok(())
    }

    pub fn release(&self) -> DriverResult<()> {
        let mut state = lock(&self.state);
        state.record(MockOp::Release)?;
        state.enabled = false;
        state.claimed = false;
        Ok(())
    }

    pub fn close(&self) -> DriverResult<()> {
        let mut state = lock(&self.state);
        state.record(MockOp::Close)?;
        state.enabled = false;
        state.claimed = false;
        state.opened = false;
        Ok(())
    }

    /// Check the device can run a command and count the call.
    pub fn command(&self) -> DriverResult<()> {
        let mut state = lock(&self.state);
        state.record(MockOp::Command)?;
        if !state.opened {
            return Err(DriverError::closed(&self.name));
        }
        if !state.claimed {
            return Err(DriverError::not_claimed(&self.name));
        }
        if !state.enabled {
            return Err(DriverError::disabled(&self.name));
        }
        Ok(())
    }

    /// Deliver a callback without blocking the caller.
    pub fn emit(&self, event: DriverEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            tracing::warn!(device = %self.name, error = %e, "Dropped simulated callback");
        }
    }
}

/// Control half of a simulated device.
#[derive(Debug)]
pub(crate) struct MockControl<X> {
    pub name: String,
    pub state: Shared<X>,
    pub notify: Arc<Notify>,
    pub event_tx: mpsc::Sender<DriverEvent>,
}

impl<X> Clone for MockControl<X> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
            event_tx: self.event_tx.clone(),
        }
    }
}

impl<X> MockControl<X> {
    pub async fn send(&self, event: DriverEvent) -> DriverResult<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| DriverError::closed(&self.name))
    }

    pub async fn power(&self, power: PowerState) -> DriverResult<()> {
        lock(&self.state).attached = !power.is_offline();
        self.send(DriverEvent::Status(StatusUpdate::Power(power))).await
    }

    pub async fn inject_error(&self, code: i32, extended: i32) -> DriverResult<()> {
        self.send(DriverEvent::Error(ErrorEvent { code, extended })).await
    }

    pub fn fail_next(&self, op: MockOp, error: DriverError) {
        lock(&self.state).failures.entry(op).or_default().push_back(error);
    }

    pub fn set_attached(&self, attached: bool) {
        lock(&self.state).attached = attached;
    }

    pub fn set_enable_delay(&self, delay: Duration) {
        lock(&self.state).enable_delay = delay;
    }

    pub fn is_claimed(&self) -> bool {
        lock(&self.state).claimed
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    pub fn call_count(&self, op: MockOp) -> usize {
        lock(&self.state).calls.get(&op).copied().unwrap_or(0)
    }
}

/// Control operations every simulated device supports.
///
/// Implemented by each device's handle so tests and the simulator surface can
/// drive any device through one interface.
pub trait SimulatorControl: Send + Sync {
    /// Device name.
    fn name(&self) -> &str;

    /// Deliver a power status update. Powering off also detaches the
    /// simulated hardware so later opens fail until power returns.
    fn power(&self, power: PowerState) -> impl Future<Output = DriverResult<()>> + Send;

    /// Deliver an error callback.
    fn inject_error(&self, code: i32, extended: i32)
    -> impl Future<Output = DriverResult<()>> + Send;

    /// Make the next call of `op` fail with `error`.
    fn fail_next(&self, op: MockOp, error: DriverError);

    /// Attach or detach the simulated hardware.
    fn set_attached(&self, attached: bool);

    /// Make enabling take `delay`; models a slow or wedged device.
    fn set_enable_delay(&self, delay: Duration);

    /// Whether the driver half currently holds a claim.
    fn is_claimed(&self) -> bool;

    /// Whether the driver half is enabled.
    fn is_enabled(&self) -> bool;

    /// Number of times `op` was called.
    fn call_count(&self, op: MockOp) -> usize;
}

/// Implement [`SimulatorControl`] for a handle wrapping a `control` field.
macro_rules! impl_simulator_control {
    ($handle:ty) => {
        impl $crate::mock::SimulatorControl for $handle {
            fn name(&self) -> &str {
                &self.control.name
            }

            async fn power(&self, power: $crate::events::PowerState) -> $crate::DriverResult<()> {
                self.control.power(power).await
            }

            async fn inject_error(&self, code: i32, extended: i32) -> $crate::DriverResult<()> {
                self.control.inject_error(code, extended).await
            }

            fn fail_next(&self, op: $crate::mock::MockOp, error: $crate::DriverError) {
                self.control.fail_next(op, error);
            }

            fn set_attached(&self, attached: bool) {
                self.control.set_attached(attached);
            }

            fn set_enable_delay(&self, delay: std::time::Duration) {
                self.control.set_enable_delay(delay);
            }

            fn is_claimed(&self) -> bool {
                self.control.is_claimed()
            }

            fn is_enabled(&self) -> bool {
                self.control.is_enabled()
            }

            fn call_count(&self, op: $crate::mock::MockOp) -> usize {
                self.control.call_count(op)
            }
        }
    };
}

pub(crate) use impl_simulator_control;
