//! Live-weight fan-out and stable-weight resolution for a scale.

use crate::pending::PendingSet;
use posgate_core::constants::LIVE_WEIGHT_CHANNEL_CAPACITY;
use posgate_core::{DeviceError, LiveWeight, Result, Weight};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// One item of the live-weight stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveWeightEvent {
    Weight(LiveWeight),
    Error(DeviceError),
}

/// Fan-out point between a scale's callbacks and its clients.
///
/// Live subscribers each own a bounded channel. A subscriber whose channel is
/// closed or full when a sample is published is dropped once the pass is
/// over. Stable-weight callers join a shared [`PendingSet`]; whichever of the
/// read loop or a device callback resolves first completes all of them.
#[derive(Debug, Default)]
pub struct WeightStreamHub {
    last: Mutex<Option<LiveWeight>>,
    subscribers: Mutex<Vec<mpsc::Sender<LiveWeightEvent>>>,
    pending: PendingSet<Weight>,
    reading: AtomicBool,
}

impl WeightStreamHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to live weight. The last known sample, if any, is queued
    /// first.
    pub fn subscribe(&self) -> mpsc::Receiver<LiveWeightEvent> {
        let (tx, rx) = mpsc::channel(LIVE_WEIGHT_CHANNEL_CAPACITY);
        if let Some(last) = self.last_weight() {
            // Fresh channel; cannot be full.
            let _ = tx.try_send(LiveWeightEvent::Weight(last));
        }
        lock(&self.subscribers).push(tx);
        debug!(subscribers = self.subscriber_count(), "Live-weight subscriber added");
        rx
    }

    /// Most recent live sample.
    pub fn last_weight(&self) -> Option<LiveWeight> {
        lock(&self.last).clone()
    }

    /// Push an event to every subscriber.
    pub fn publish(&self, event: LiveWeightEvent) {
        if let LiveWeightEvent::Weight(weight) = &event {
            *lock(&self.last) = Some(weight.clone());
        }

        let targets = lock(&self.subscribers).clone();
        let dead: Vec<_> = targets
            .into_iter()
            .filter(|tx| tx.try_send(event.clone()).is_err())
            .collect();

        if !dead.is_empty() {
            lock(&self.subscribers).retain(|tx| !dead.iter().any(|d| d.same_channel(tx)));
            debug!(pruned = dead.len(), "Pruned live-weight subscribers");
        }
        trace!(?event, "Live weight published");
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Join the pending stable-weight requests.
    pub fn join_stable(&self) -> oneshot::Receiver<Result<Weight>> {
        self.pending.join()
    }

    /// Stable-weight callers still waiting.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Claim the read loop. `false` when one is already running.
    pub fn start_read(&self) -> bool {
        self.reading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_reading(&self) -> bool {
        self.reading.load(Ordering::Acquire)
    }

    /// End the read loop and resolve every waiter with its outcome.
    pub fn finish_read(&self, outcome: Result<Weight>) -> usize {
        self.reading.store(false, Ordering::Release);
        self.resolve_stable(outcome)
    }

    /// Resolve every waiting stable-weight request.
    pub fn resolve_stable(&self, outcome: Result<Weight>) -> usize {
        let resolved = self.pending.resolve_all(outcome);
        if resolved > 0 {
            debug!(resolved, "Stable weight resolved");
        }
        resolved
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
