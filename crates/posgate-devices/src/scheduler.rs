//! Background reconnect loop.
//!
//! One task per configured device kind calls
//! [`DeviceRegistry::connect`] after an initial delay and then on a fixed
//! period, independent of client traffic. A connect that finds the device
//! lock held is skipped for that tick.

use crate::registry::DeviceRegistry;
use posgate_core::DeviceKind;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Running reconnect tasks.
#[derive(Debug)]
pub struct ReconnectScheduler {
    tasks: JoinSet<DeviceKind>,
    shutdown: CancellationToken,
}

impl ReconnectScheduler {
    /// Start one reconnect task per configured kind.
    pub fn start(registry: Arc<DeviceRegistry>) -> Self {
        let shutdown = CancellationToken::new();
        let timing = *registry.timing();
        let mut tasks = JoinSet::new();

        for kind in registry.kinds() {
            let registry = Arc::clone(&registry);
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                let start = Instant::now() + timing.reconnect_initial_delay;
                let mut ticks = tokio::time::interval_at(start, timing.reconnect_period);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        _ = ticks.tick() => {
                            if let Err(e) = registry.connect(kind).await {
                                debug!(%kind, error = %e, "Scheduled connect failed");
                            }
                        }
                    }
                }
                kind
            });
        }

        info!(
            tasks = tasks.len(),
            period = ?timing.reconnect_period,
            "Reconnect scheduler started"
        );
        Self { tasks, shutdown }
    }

    /// Number of reconnect tasks still running.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stop every task and wait for them to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();

        let mut panics = 0;
        while let Some(result) = self.tasks.join_next().await {
            match classify_task_result(result) {
                TaskTermination::Stopped(kind) => debug!(%kind, "Reconnect task stopped"),
                TaskTermination::Cancelled => {}
                TaskTermination::Panic => panics += 1,
            }
        }

        if panics > 0 {
            warn!(panics, "Reconnect tasks panicked before shutdown");
        }
        info!("Reconnect scheduler stopped");
    }
}

/// How a reconnect task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    /// Left its loop on shutdown.
    Stopped(DeviceKind),
    /// Aborted.
    Cancelled,
    Panic,
}

fn classify_task_result(result: Result<DeviceKind, JoinError>) -> TaskTermination {
    match result {
        Ok(kind) => TaskTermination::Stopped(kind),
        Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
        Err(_) => TaskTermination::Panic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::DeviceTiming;
    use posgate_hardware::mock::{MockLineDisplay, MockOp, MockPrinter, SimulatorControl};
    use posgate_hardware::{AnyLineDisplay, AnyPrinter};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_devices_connect_after_initial_delay() {
        let (display, display_handle) = MockLineDisplay::new("Line Display");
        let (printer, printer_handle) = MockPrinter::new("Printer");
        let registry = Arc::new(
            DeviceRegistry::builder()
                .line_display(AnyLineDisplay::Mock(display))
                .printer(AnyPrinter::Mock(printer))
                .build(),
        );
        printer_handle.set_attached(false);

        let scheduler = ReconnectScheduler::start(Arc::clone(&registry));
        assert_eq!(scheduler.len(), 2);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(display_handle.call_count(MockOp::Open), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(registry.line_display().unwrap().is_connected());
        assert!(!registry.printer().unwrap().is_connected());

        // The printer is retried every period until it shows up.
        printer_handle.set_attached(true);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(registry.printer().unwrap().is_connected());
        assert!(printer_handle.call_count(MockOp::Open) >= 2);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_device_is_left_alone() {
        let (display, handle) = MockLineDisplay::new("Line Display");
        let registry = Arc::new(
            DeviceRegistry::builder()
                .timing(DeviceTiming {
                    reconnect_initial_delay: Duration::ZERO,
                    ..DeviceTiming::default()
                })
                .line_display(AnyLineDisplay::Mock(display))
                .build(),
        );

        let scheduler = ReconnectScheduler::start(registry);
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(handle.call_count(MockOp::Open), 1);
        scheduler.shutdown().await;
    }

    #[test]
    fn test_classify_task_result() {
        assert_eq!(
            classify_task_result(Ok(DeviceKind::Scale)),
            TaskTermination::Stopped(DeviceKind::Scale)
        );
    }
}
