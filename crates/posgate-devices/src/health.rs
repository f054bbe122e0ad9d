//! Lazily refreshed device health.
//!
//! [`HealthCache`] holds one [`HealthRecord`] per device name and is shared by
//! every manager. Each manager owns a [`HealthMonitor`] that decides, per
//! status read, whether the cached record is good enough or a live check is
//! due:
//!
//! | Phase | Status read |
//! |---|---|
//! | `FirstConnect` | cached record (live check if none) |
//! | `CheckHealth` | one live check, then `HealthUpdated` |
//! | `HealthUpdated` | cached record (live check if none or expired) |
//!
//! The first scheduled connect attempt moves a monitor from `FirstConnect` to
//! `CheckHealth`, so the first status read after startup reflects reality.

use chrono::Utc;
use posgate_core::{HealthRecord, HealthStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Health slots shared across devices.
#[derive(Debug, Clone, Default)]
pub struct HealthCache {
    slots: Arc<RwLock<HashMap<String, HealthRecord>>>,
}

/// The cache's lock was poisoned by a panicking writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheUnavailable;

impl HealthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached record for `name`.
    pub fn get(&self, name: &str) -> Result<Option<HealthRecord>, CacheUnavailable> {
        let slots = self.slots.read().map_err(|_| CacheUnavailable)?;
        Ok(slots.get(name).cloned())
    }

    /// Replace the slot for the record's device.
    pub fn put(&self, record: HealthRecord) -> Result<(), CacheUnavailable> {
        let mut slots = self.slots.write().map_err(|_| CacheUnavailable)?;
        slots.insert(record.device_name.clone(), record);
        Ok(())
    }

    /// Every cached record, sorted by device name.
    pub fn snapshot(&self) -> Result<Vec<HealthRecord>, CacheUnavailable> {
        let slots = self.slots.read().map_err(|_| CacheUnavailable)?;
        let mut records: Vec<_> = slots.values().cloned().collect();
        records.sort_by(|a, b| a.device_name.cmp(&b.device_name));
        Ok(records)
    }
}

/// Health phase of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthPhase {
    FirstConnect,
    CheckHealth,
    HealthUpdated,
}

/// Per-device health policy over a shared [`HealthCache`].
#[derive(Debug)]
pub struct HealthMonitor {
    name: String,
    cache: HealthCache,
    phase: Mutex<HealthPhase>,
    max_age: Option<Duration>,
}

impl HealthMonitor {
    pub fn new(name: impl Into<String>, cache: HealthCache, max_age: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            cache,
            phase: Mutex::new(HealthPhase::FirstConnect),
            max_age,
        }
    }

    pub fn phase(&self) -> HealthPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record that a scheduled connect attempt finished.
    pub fn connect_attempted(&self) {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *phase == HealthPhase::FirstConnect {
            *phase = HealthPhase::CheckHealth;
        }
    }

    /// Live health: build a record from `connected` and overwrite the cache.
    pub fn health(&self, connected: bool) -> HealthRecord {
        let record = HealthRecord::now(&self.name, HealthStatus::from(connected));
        if self.cache.put(record.clone()).is_err() {
            tracing::warn!(device = %self.name, "Health cache unavailable; record not stored");
        }
        record
    }

    /// Cached health, refreshed through `live` when due.
    ///
    /// The first read after the first connect attempt always checks live,
    /// whether or not anything was cached before it.
    pub fn status(&self, live: impl FnOnce() -> bool) -> HealthRecord {
        {
            let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
            if *phase == HealthPhase::CheckHealth {
                *phase = HealthPhase::HealthUpdated;
                drop(phase);
                return self.health(live());
            }
        }

        match self.cache.get(&self.name) {
            Ok(Some(cached)) if !self.is_expired(&cached) => cached,
            Ok(_) => self.health(live()),
            Err(CacheUnavailable) => {
                tracing::warn!(device = %self.name, "Health cache unavailable; checking live");
                self.health(live())
            }
        }
    }

    fn is_expired(&self, record: &HealthRecord) -> bool {
        let Some(max_age) = self.max_age else {
            return false;
        };
        let age = Utc::now().signed_duration_since(record.cached_at);
        age.to_std().is_ok_and(|age| age > max_age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &AtomicUsize, connected: bool) -> impl FnOnce() -> bool + '_ {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            connected
        }
    }

    #[test]
    fn test_startup_status_checks_live_once() {
        let monitor = HealthMonitor::new("Scale", HealthCache::new(), None);
        let checks = AtomicUsize::new(0);

        let first = monitor.status(counting(&checks, false));
        assert_eq!(first.health_status, HealthStatus::NotReady);
        assert_eq!(checks.load(Ordering::SeqCst), 1);

        let second = monitor.status(counting(&checks, true));
        assert_eq!(second.health_status, HealthStatus::NotReady);
        assert_eq!(checks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_connect_triggers_exactly_one_refresh() {
        let monitor = HealthMonitor::new("Scale", HealthCache::new(), None);
        let checks = AtomicUsize::new(0);
        monitor.status(counting(&checks, false));

        monitor.connect_attempted();
        assert_eq!(monitor.phase(), HealthPhase::CheckHealth);

        let refreshed = monitor.status(counting(&checks, true));
        assert_eq!(refreshed.health_status, HealthStatus::Ready);
        assert_eq!(monitor.phase(), HealthPhase::HealthUpdated);

        monitor.status(counting(&checks, false));
        monitor.connect_attempted();
        assert_eq!(monitor.phase(), HealthPhase::HealthUpdated);
        assert_eq!(checks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_status_after_first_connect_checks_live_once() {
        let monitor = HealthMonitor::new("Check Reader", HealthCache::new(), None);
        let checks = AtomicUsize::new(0);

        monitor.connect_attempted();
        for _ in 0..3 {
            let record = monitor.status(counting(&checks, true));
            assert_eq!(record.health_status, HealthStatus::Ready);
        }

        assert_eq!(checks.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.phase(), HealthPhase::HealthUpdated);
    }

    #[test]
    fn test_explicit_health_overwrites_cache() {
        let cache = HealthCache::new();
        let monitor = HealthMonitor::new("Printer", cache.clone(), None);

        monitor.health(true);
        monitor.health(false);

        let cached = cache.get("Printer").unwrap().unwrap();
        assert_eq!(cached.health_status, HealthStatus::NotReady);
        assert_eq!(monitor.status(|| true).health_status, HealthStatus::NotReady);
    }

    #[test]
    fn test_poisoned_cache_falls_back_to_live() {
        let cache = HealthCache::new();
        let slots = Arc::clone(&cache.slots);
        let _ = std::thread::spawn(move || {
            let _guard = slots.write().unwrap();
            panic!("poison the cache");
        })
        .join();

        assert_eq!(cache.get("Scale"), Err(CacheUnavailable));

        let monitor = HealthMonitor::new("Scale", cache, None);
        let checks = AtomicUsize::new(0);
        monitor.status(counting(&checks, true));
        monitor.status(counting(&checks, true));
        assert_eq!(checks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_expired_record_is_refreshed() {
        let cache = HealthCache::new();
        let monitor = HealthMonitor::new("Scale", cache.clone(), Some(Duration::from_secs(60)));

        let mut stale = HealthRecord::now("Scale", HealthStatus::NotReady);
        stale.cached_at -= chrono::Duration::seconds(120);
        cache.put(stale).unwrap();

        assert_eq!(monitor.status(|| true).health_status, HealthStatus::Ready);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let cache = HealthCache::new();
        cache.put(HealthRecord::now("Scale", HealthStatus::Ready)).unwrap();
        cache.put(HealthRecord::now("Check Reader", HealthStatus::NotReady)).unwrap();

        let names: Vec<_> = cache
            .snapshot()
            .unwrap()
            .into_iter()
            .map(|r| r.device_name)
            .collect();
        assert_eq!(names, vec!["Check Reader", "Scale"]);
    }
}
