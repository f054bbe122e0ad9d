//! Simulated check (MICR) reader.

use super::lifecycle::{MockControl, MockCore, impl_simulator_control, lock};
use crate::DriverResult;
use crate::codes;
use crate::error::DriverError;
use crate::events::{DataEvent, DriverEvent, ErrorEvent};
use crate::traits::{CheckReaderDriver, DeviceDriver};
use posgate_core::{DeviceKind, MicrData};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// What the reader finds on the MICR line of the inserted check.
#[derive(Debug, Clone)]
enum Slot {
    Readable(MicrData),
    Unreadable(i32),
}

#[derive(Debug, Default)]
pub(crate) struct CheckState {
    slot: Option<Slot>,
    ejections: usize,
}

/// Simulated check reader.
///
/// `begin_insertion` waits for a check placed through the handle;
/// `end_insertion` reads it and delivers the MICR line (or an extended
/// error) as a callback.
#[derive(Debug)]
pub struct MockCheckReader {
    core: MockCore<CheckState>,
}

impl MockCheckReader {
    /// Create a reader and the handle that drives it.
    pub fn new(name: impl Into<String>) -> (Self, MockCheckReaderHandle) {
        let (core, control) = MockCore::new(name, DeviceKind::CheckReader);
        (Self { core }, MockCheckReaderHandle { control })
    }

    fn has_check(&self) -> bool {
        lock(&self.core.state).ext.slot.is_some()
    }
}

impl DeviceDriver for MockCheckReader {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> DeviceKind {
        self.core.kind
    }

    async fn open(&mut self) -> DriverResult<()> {
        self.core.open()
    }

    async fn claim(&mut self, _timeout: Duration) -> DriverResult<()> {
        self.core.claim()
    }

    async fn set_device_enabled(&mut self, enabled: bool) -> DriverResult<()> {
        self.core.set_device_enabled(enabled).await
    }

    async fn release(&mut self) -> DriverResult<()> {
        self.core.release()
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.core.close()
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        self.core.take_events()
    }
}

impl CheckReaderDriver for MockCheckReader {
    async fn begin_insertion(&mut self, timeout: Duration) -> DriverResult<()> {
        self.core.command()?;
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.core.notify.notified();
            if self.has_check() {
                return Ok(());
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(DriverError::timeout(&self.core.name));
            }
        }
    }

    async fn end_insertion(&mut self) -> DriverResult<()> {
        self.core.command()?;
        let slot = lock(&self.core.state).ext.slot.clone();

        let event = match slot {
            Some(Slot::Readable(micr)) => DriverEvent::Data(DataEvent::Micr(micr)),
            Some(Slot::Unreadable(extended)) => DriverEvent::Error(ErrorEvent {
                code: codes::E_EXTENDED,
                extended,
            }),
            None => {
                return Err(DriverError::new(codes::E_ILLEGAL, "No check inserted"));
            }
        };
        self.core.emit(event);
        Ok(())
    }

    async fn begin_removal(&mut self, _timeout: Duration) -> DriverResult<()> {
        self.core.command()?;
        let mut state = lock(&self.core.state);
        if state.ext.slot.take().is_some() {
            state.ext.ejections += 1;
        }
        Ok(())
    }

    async fn end_removal(&mut self) -> DriverResult<()> {
        self.core.command()
    }
}

/// Control handle for a [`MockCheckReader`].
#[derive(Debug, Clone)]
pub struct MockCheckReaderHandle {
    control: MockControl<CheckState>,
}

impl MockCheckReaderHandle {
    /// Insert a check whose MICR line reads as `micr`.
    pub fn insert_check(&self, micr: MicrData) {
        self.insert(Slot::Readable(micr));
    }

    /// Insert a check the reader cannot decode; reading it reports `extended`.
    pub fn insert_unreadable_check(&self, extended: i32) {
        self.insert(Slot::Unreadable(extended));
    }

    /// Whether a check is sitting in the reader.
    pub fn has_check(&self) -> bool {
        lock(&self.control.state).ext.slot.is_some()
    }

    /// Number of checks ejected so far.
    pub fn ejections(&self) -> usize {
        lock(&self.control.state).ext.ejections
    }

    fn insert(&self, slot: Slot) {
        lock(&self.control.state).ext.slot = Some(slot);
        self.control.notify.notify_one();
    }
}

impl_simulator_control!(MockCheckReaderHandle);
