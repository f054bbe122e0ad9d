//! Pending requests resolved from device callbacks.
//!
//! A client call that waits on hardware registers a pending request, issues
//! the device command and awaits the request. The event bridge later
//! resolves it from the data or error callback.
//!
//! - [`PendingSlot`] holds at most one request (scanners, check reader).
//! - [`PendingSet`] holds any number of requests that all resolve with the
//!   same outcome (stable weight).

use posgate_core::{DeviceError, Result};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

struct Waiter<T> {
    tx: oneshot::Sender<Result<T>>,
    cancel: CancellationToken,
}

/// Single-slot pending request.
pub struct PendingSlot<T> {
    waiter: Mutex<Option<Waiter<T>>>,
}

impl<T> Default for PendingSlot<T> {
    fn default() -> Self {
        Self {
            waiter: Mutex::new(None),
        }
    }
}

impl<T> std::fmt::Debug for PendingSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSlot")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<T> PendingSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the request. Fails with DEVICE_BUSY if a live request is
    /// already waiting; an abandoned one is replaced.
    pub fn register(&self) -> Result<PendingRequest<T>> {
        let mut waiter = self.lock();
        if waiter.as_ref().is_some_and(|w| !w.tx.is_closed()) {
            return Err(DeviceError::busy());
        }

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        *waiter = Some(Waiter {
            tx,
            cancel: cancel.clone(),
        });

        Ok(PendingRequest { rx, cancel })
    }

    /// Complete the request, clearing the slot. Returns `false` when nothing
    /// was waiting.
    pub fn resolve(&self, outcome: Result<T>) -> bool {
        match self.lock().take() {
            Some(waiter) => waiter.tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Fail the request with `error` and raise its cancellation flag.
    pub fn cancel(&self, error: DeviceError) -> bool {
        match self.lock().take() {
            Some(waiter) => {
                waiter.cancel.cancel();
                waiter.tx.send(Err(error)).is_ok()
            }
            None => false,
        }
    }

    /// Drop whatever is registered without completing it.
    pub fn clear(&self) {
        self.lock().take();
    }

    pub fn is_pending(&self) -> bool {
        self.lock().as_ref().is_some_and(|w| !w.tx.is_closed())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Waiter<T>>> {
        self.waiter.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Caller's side of a pending request.
#[derive(Debug)]
pub struct PendingRequest<T> {
    rx: oneshot::Receiver<Result<T>>,
    cancel: CancellationToken,
}

impl<T> PendingRequest<T> {
    /// Cancellation flag shared with whoever resolves the request.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait at most `timeout` for the outcome; TIMEOUT when it elapses.
    pub async fn wait(self, timeout: Duration) -> Result<T> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(DeviceError::unexpected()),
            Err(_) => Err(DeviceError::timeout()),
        }
    }
}

/// Any number of pending requests resolved together.
pub struct PendingSet<T> {
    waiters: Mutex<Vec<oneshot::Sender<Result<T>>>>,
}

impl<T> Default for PendingSet<T> {
    fn default() -> Self {
        Self {
            waiters: Mutex::new(Vec::new()),
        }
    }
}

impl<T> std::fmt::Debug for PendingSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSet").field("len", &self.len()).finish()
    }
}

impl<T> PendingSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the set. Callers that already gave up are pruned first.
    pub fn join(&self) -> oneshot::Receiver<Result<T>> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.lock();
        waiters.retain(|tx| !tx.is_closed());
        waiters.push(tx);
        rx
    }

    /// Requests whose callers are still waiting.
    pub fn len(&self) -> usize {
        self.lock().iter().filter(|tx| !tx.is_closed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Senders held, including those whose callers left.
    #[cfg(test)]
    fn held(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<oneshot::Sender<Result<T>>>> {
        self.waiters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clone> PendingSet<T> {
    /// Complete every waiting request with `outcome` and empty the set.
    /// Returns how many callers were still listening.
    pub fn resolve_all(&self, outcome: Result<T>) -> usize {
        let waiters = std::mem::take(&mut *self.lock());
        waiters
            .into_iter()
            .map(|tx| tx.send(outcome.clone()))
            .filter(|sent| sent.is_ok())
            .count()
    }
}
