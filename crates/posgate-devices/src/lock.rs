//! Per-device connection lock.
//!
//! Connect, disconnect and device commands for one device are serialized by a
//! [`ConnectionLock`]. Acquisition is bounded: [`ConnectionLock::try_lock`]
//! gives up after the configured timeout and returns `None`, which callers
//! report as "device busy". Waiters are served in FIFO order.
//!
//! The guard is owned, so it can move into a spawned task, and it releases
//! on every exit path when dropped.

use posgate_core::{DeviceError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Fair, bounded mutual exclusion for one device.
#[derive(Debug, Clone)]
pub struct ConnectionLock {
    name: Arc<str>,
    inner: Arc<Mutex<()>>,
    timeout: Duration,
}

/// Proof of holding a [`ConnectionLock`]. Released on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    name: Arc<str>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        tracing::trace!(device = %self.name, "Connection lock released");
    }
}

impl ConnectionLock {
    /// Create a lock for `name` with a bounded acquisition `timeout`.
    pub fn new(name: impl Into<Arc<str>>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(())),
            timeout,
        }
    }

    /// Wait up to the configured timeout for the lock.
    pub async fn try_lock(&self) -> Option<ConnectionGuard> {
        match tokio::time::timeout(self.timeout, Arc::clone(&self.inner).lock_owned()).await {
            Ok(guard) => Some(self.guard(guard)),
            Err(_) => {
                tracing::debug!(device = %self.name, timeout = ?self.timeout, "Connection lock timed out");
                None
            }
        }
    }

    /// Take the lock only if it is free right now.
    pub fn try_lock_now(&self) -> Option<ConnectionGuard> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .ok()
            .map(|guard| self.guard(guard))
    }

    /// [`try_lock`](Self::try_lock), failing with DEVICE_BUSY on timeout.
    pub async fn lock_or_busy(&self) -> Result<ConnectionGuard> {
        self.try_lock().await.ok_or_else(DeviceError::busy)
    }

    /// Whether someone currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    fn guard(&self, guard: OwnedMutexGuard<()>) -> ConnectionGuard {
        tracing::trace!(device = %self.name, "Connection lock acquired");
        ConnectionGuard {
            name: Arc::clone(&self.name),
            _guard: guard,
        }
    }
}
