//! Error type raised by device drivers.
//!
//! A [`DriverError`] carries the native result code and extended code exactly
//! as the driver reported them. It never leaves the device layer: managers
//! translate it with [`crate::mapping::map_error`].

use crate::codes;

/// Result type alias for driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Failure reported by a device driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Driver error {code} (extended {extended}): {message}")]
pub struct DriverError {
    /// Native result code.
    pub code: i32,

    /// Native extended code, `0` when absent.
    pub extended: i32,

    /// Driver-supplied message.
    pub message: String,
}

impl DriverError {
    /// Create an error from a result code.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            extended: 0,
            message: message.into(),
        }
    }

    /// Create an [`codes::E_EXTENDED`] error carrying a category-specific code.
    pub fn extended(extended: i32, message: impl Into<String>) -> Self {
        Self {
            code: codes::E_EXTENDED,
            extended,
            message: message.into(),
        }
    }

    /// Device is closed.
    pub fn closed(device: &str) -> Self {
        Self::new(codes::E_CLOSED, format!("{device} is closed"))
    }

    /// Device is not claimed by this application.
    pub fn not_claimed(device: &str) -> Self {
        Self::new(codes::E_NOTCLAIMED, format!("{device} is not claimed"))
    }

    /// Device is claimed but disabled.
    pub fn disabled(device: &str) -> Self {
        Self::new(codes::E_DISABLED, format!("{device} is disabled"))
    }

    /// No hardware attached.
    pub fn no_hardware(device: &str) -> Self {
        Self::new(codes::E_NOHARDWARE, format!("{device} has no hardware attached"))
    }

    /// Device did not complete within the timeout.
    pub fn timeout(device: &str) -> Self {
        Self::new(codes::E_TIMEOUT, format!("{device} timed out"))
    }

    /// Generic failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(codes::E_FAILURE, message)
    }

    /// Whether this is a plain timeout.
    pub fn is_timeout(&self) -> bool {
        self.code == codes::E_TIMEOUT
    }
}
