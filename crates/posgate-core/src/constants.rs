//! Timing and sizing constants for the gateway.
//!
//! These are the defaults; `posgate-server` lets every timing value be
//! overridden from configuration.
//!
//! # Timeout horizons
//!
//! Client-facing calls are bounded by several nested limits:
//!
//! ```text
//! stable weight:  read poll (1s) < session timeout (10s) < hang safety (10s + 20s)
//! check read:     insertion poll (500ms) < insertion timeout (30s)
//! device lock:    bounded acquisition (10s)
//! ```

use std::time::Duration;

// ============================================================================
// Locking
// ============================================================================

/// Maximum time to wait for a device's connection lock.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum time a driver is given to grant an exclusive claim.
pub const CLAIM_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Reconnect scheduling
// ============================================================================

/// Period of the background reconnect task for every device kind.
pub const RECONNECT_PERIOD: Duration = Duration::from_secs(5);

/// Delay before the first background reconnect attempt.
pub const RECONNECT_INITIAL_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// Scale
// ============================================================================

/// Outer bound of a stable-weight read loop.
pub const STABLE_WEIGHT_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra time a caller waits on top of [`STABLE_WEIGHT_TIMEOUT`] before
/// giving up on a wedged read loop.
pub const HANG_SAFETY_MARGIN: Duration = Duration::from_secs(20);

/// Timeout handed to each call of the driver's read primitive.
pub const WEIGHT_READ_POLL: Duration = Duration::from_secs(1);

// ============================================================================
// Check reader
// ============================================================================

/// How long a check insertion may take before the read is abandoned.
pub const CHECK_INSERTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout of each begin-insertion call; the cancel flag is checked between calls.
pub const CHECK_INSERTION_POLL: Duration = Duration::from_millis(500);

/// How long to wait for MICR data after the insertion completed.
pub const CHECK_DATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for ejecting a check.
pub const CHECK_REMOVAL_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Scanner
// ============================================================================

/// Upper bound of a scan race.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Enable latency under which a hand-held scanner is considered healthy.
pub const HANDHELD_HEALTHY_ENABLE: Duration = Duration::from_millis(500);

/// Maximum disconnect/reconnect/re-enable recovery attempts for a hand-held scanner.
pub const HANDHELD_RECOVERY_ATTEMPTS: usize = 3;

// ============================================================================
// Line display
// ============================================================================

/// Characters per line-display row.
pub const LINE_DISPLAY_WIDTH: usize = 20;

// ============================================================================
// Channels
// ============================================================================

/// Capacity of each device's callback channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of each live-weight subscriber channel.
pub const LIVE_WEIGHT_CHANNEL_CAPACITY: usize = 16;

/// Capacity of the connection-changed broadcast channel.
pub const CONNECTION_EVENT_CAPACITY: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_horizons_are_nested() {
        assert!(WEIGHT_READ_POLL < STABLE_WEIGHT_TIMEOUT);
        assert!(STABLE_WEIGHT_TIMEOUT < STABLE_WEIGHT_TIMEOUT + HANG_SAFETY_MARGIN);
        assert!(CHECK_INSERTION_POLL < CHECK_INSERTION_TIMEOUT);
        assert!(HANDHELD_HEALTHY_ENABLE < LOCK_TIMEOUT);
    }
}
