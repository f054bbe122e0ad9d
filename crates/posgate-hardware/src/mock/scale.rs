//! Simulated weighing scale.

use super::lifecycle::{MockControl, MockCore, impl_simulator_control, lock};
use crate::DriverResult;
use crate::error::DriverError;
use crate::events::{DriverEvent, StatusUpdate};
use crate::traits::{DeviceDriver, ScaleDriver};
use posgate_core::{DeviceKind, ScaleStatus, Weight};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub(crate) struct ScaleState {
    reads: VecDeque<DriverResult<Weight>>,
    hang: bool,
    status_notify: bool,
}

enum NextRead {
    Ready(DriverResult<Weight>),
    Hang,
    Wait,
}

/// Simulated scale.
///
/// A stable read consumes the next result queued through the handle, waiting
/// for one up to the read timeout. Live samples are pushed as status updates.
#[derive(Debug)]
pub struct MockScale {
    core: MockCore<ScaleState>,
}

impl MockScale {
    /// Create a scale and the handle that drives it.
    pub fn new(name: impl Into<String>) -> (Self, MockScaleHandle) {
        let (core, control) = MockCore::new(name, DeviceKind::Scale);
        (Self { core }, MockScaleHandle { control })
    }

    fn next_read(&self) -> NextRead {
        let mut state = lock(&self.core.state);
        if state.ext.hang {
            return NextRead::Hang;
        }
        match state.ext.reads.pop_front() {
            Some(result) => NextRead::Ready(result),
            None => NextRead::Wait,
        }
    }
}

impl DeviceDriver for MockScale {
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
        lock(&self.core.state).ext.status_notify = false;
        self.core.close()
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        self.core.take_events()
    }
}

impl ScaleDriver for MockScale {
    async fn read_weight(&mut self, timeout: Duration) -> DriverResult<Weight> {
        self.core.command()?;
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.core.notify.notified();
            match self.next_read() {
                NextRead::Ready(result) => return result,
                NextRead::Hang => std::future::pending::<()>().await,
                NextRead::Wait => {}
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(DriverError::timeout(&self.core.name));
            }
        }
    }

    async fn set_status_notify(&mut self, enabled: bool) -> DriverResult<()> {
        lock(&self.core.state).ext.status_notify = enabled;
        Ok(())
    }
}

/// Control handle for a [`MockScale`].
#[derive(Debug, Clone)]
pub struct MockScaleHandle {
    control: MockControl<ScaleState>,
}

impl MockScaleHandle {
    /// Settle the platter at `weight`; the next stable read returns it.
    pub fn place_stable_weight(&self, weight: Weight) {
        self.push_read(Ok(weight));
    }

    /// Make the next stable read fail with `error`.
    pub fn fail_next_read(&self, error: DriverError) {
        self.push_read(Err(error));
    }

    /// Make stable reads block forever, ignoring their timeout.
    pub fn hang_reads(&self, hang: bool) {
        lock(&self.control.state).ext.hang = hang;
        self.control.notify.notify_one();
    }

    /// Push a live sample.
    ///
    /// Returns `false` when status notification is off or the scale is
    /// disabled, in which case no sample is delivered.
    pub async fn set_live_weight(
        &self,
        status: ScaleStatus,
        weight: Option<Weight>,
    ) -> DriverResult<bool> {
        let deliver = {
            let state = lock(&self.control.state);
            state.enabled && state.ext.status_notify
        };
        if !deliver {
            return Ok(false);
        }

        self.control
            .send(DriverEvent::Status(StatusUpdate::Scale { status, weight }))
            .await?;
        Ok(true)
    }

    fn push_read(&self, result: DriverResult<Weight>) {
        lock(&self.control.state).ext.reads.push_back(result);
        self.control.notify.notify_one();
    }
}

impl_simulator_control!(MockScaleHandle);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    async fn ready() -> (MockScale, MockScaleHandle) {
        let (mut scale, handle) = MockScale::new("Scale");
        scale.open().await.unwrap();
        scale.claim(Duration::from_secs(1)).await.unwrap();
        scale.set_device_enabled(true).await.unwrap();
        (scale, handle)
    }

    #[tokio::test]
    async fn test_read_returns_placed_weight() {
        let (mut scale, handle) = ready().await;
        handle.place_stable_weight(Weight(1250));
        assert_eq!(scale.read_weight(Duration::from_secs(1)).await, Ok(Weight(1250)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_waits_for_weight() {
        let (mut scale, handle) = ready().await;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            handle.place_stable_weight(Weight(500));
        });
        assert_eq!(scale.read_weight(Duration::from_secs(1)).await, Ok(Weight(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out() {
        let (mut scale, _handle) = ready().await;
        let error = scale.read_weight(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(error.code, codes::E_TIMEOUT);
    }

    #[tokio::test]
    async fn test_scripted_read_failure() {
        let (mut scale, handle) = ready().await;
        handle.fail_next_read(DriverError::extended(codes::ESCAL_UNDER_ZERO, "under zero"));
        let error = scale.read_weight(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(error.extended, codes::ESCAL_UNDER_ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_read_ignores_timeout() {
        let (mut scale, handle) = ready().await;
        handle.hang_reads(true);
        let outcome =
            tokio::time::timeout(Duration::from_secs(30), scale.read_weight(Duration::from_secs(1)))
                .await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_live_weight_needs_status_notify() {
        let (mut scale, handle) = ready().await;
        let mut events = scale.take_events().unwrap();

        assert!(!handle.set_live_weight(ScaleStatus::Stable, Some(Weight(10))).await.unwrap());
        scale.set_status_notify(true).await.unwrap();
        assert!(handle.set_live_weight(ScaleStatus::Stable, Some(Weight(10))).await.unwrap());

        assert_eq!(
            events.recv().await,
            Some(DriverEvent::Status(StatusUpdate::Scale {
                status: ScaleStatus::Stable,
                weight: Some(Weight(10)),
            }))
        );
    }
}
