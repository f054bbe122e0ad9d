//! Timeout horizons used by the device layer.

use posgate_core::constants;
use std::time::Duration;

/// Every bound the device layer applies, with defaults from
/// [`posgate_core::constants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTiming {
    /// Bounded wait for a device's connection lock.
    pub lock_timeout: Duration,

    /// Claim timeout passed to the driver.
    pub claim_timeout: Duration,

    /// Period of the background reconnect tasks.
    pub reconnect_period: Duration,

    /// Delay before the first background reconnect.
    pub reconnect_initial_delay: Duration,

    /// Inner bound on a stable-weight read loop.
    pub stable_weight_timeout: Duration,

    /// Added to the inner stable-weight bound for the caller's own wait.
    pub hang_safety_margin: Duration,

    /// Bound on a scan race.
    pub scan_timeout: Duration,

    /// Bound on waiting for a check to be inserted.
    pub check_insertion_timeout: Duration,

    /// Cached health older than this is refreshed on a status read.
    pub health_max_age: Option<Duration>,
}

impl DeviceTiming {
    /// Bound on the caller's wait for a stable weight.
    pub fn stable_weight_caller_timeout(&self) -> Duration {
        self.stable_weight_timeout + self.hang_safety_margin
    }
}

impl Default for DeviceTiming {
    fn default() -> Self {
        Self {
            lock_timeout: constants::LOCK_TIMEOUT,
            claim_timeout: constants::CLAIM_TIMEOUT,
            reconnect_period: constants::RECONNECT_PERIOD,
            reconnect_initial_delay: constants::RECONNECT_INITIAL_DELAY,
            stable_weight_timeout: constants::STABLE_WEIGHT_TIMEOUT,
            hang_safety_margin: constants::HANG_SAFETY_MARGIN,
            scan_timeout: constants::SCAN_TIMEOUT,
            check_insertion_timeout: constants::CHECK_INSERTION_TIMEOUT,
            health_max_age: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_bound_covers_inner_bound() {
        let timing = DeviceTiming::default();
        assert_eq!(timing.stable_weight_caller_timeout(), Duration::from_secs(30));
        assert!(timing.health_max_age.is_none());
    }
}
