//! Closed error taxonomy shared by every device kind.
//!
//! Driver-level native codes are translated into an [`ErrorCode`] at the
//! event bridge or command boundary. Nothing past a device manager ever sees
//! a raw native code; callers receive a [`DeviceError`] carrying a stable
//! code, a human description and an HTTP status analogue.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, client-visible error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Device is closed, unclaimed, powered off or missing.
    DeviceOffline,

    /// Device (or its connection lock) is held by another operation.
    DeviceBusy,

    /// The device did not produce a result within the allowed time.
    Timeout,

    /// The caller (or the device on the caller's behalf) gave up waiting.
    ClientCancelled,

    /// Printer timed out waiting on a MICR read.
    MicrTimeout,

    /// The device read data it could not decode.
    BadData,

    /// The request or the media is in a format the device cannot handle.
    InvalidFormat,

    /// Physical fault such as a jam or an open cover on a reader.
    HardwareError,

    /// Printer cover is open.
    CoverOpen,

    /// Receipt station has no paper.
    OutOfPaper,

    /// The device rejected the command in its current state.
    IllegalOperation,

    /// Scale must be re-zeroed before it can weigh.
    NeedsZeroing,

    /// Scale reports a weight below zero.
    UnderZero,

    /// Scale capacity exceeded.
    Overweight,

    /// Scanner was disabled while a scan was pending.
    Disabled,

    /// Cancel requested while nothing was in flight.
    AlreadyDisabled,

    /// Anything the taxonomy does not name.
    UnexpectedError,
}

impl ErrorCode {
    /// Wire name of the code, e.g. `"DEVICE_OFFLINE"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceOffline => "DEVICE_OFFLINE",
            Self::DeviceBusy => "DEVICE_BUSY",
            Self::Timeout => "TIMEOUT",
            Self::ClientCancelled => "CLIENT_CANCELLED",
            Self::MicrTimeout => "MICR_TIMEOUT",
            Self::BadData => "BAD_DATA",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::HardwareError => "HARDWARE_ERROR",
            Self::CoverOpen => "COVER_OPEN",
            Self::OutOfPaper => "OUT_OF_PAPER",
            Self::IllegalOperation => "ILLEGAL_OPERATION",
            Self::NeedsZeroing => "NEEDS_ZEROING",
            Self::UnderZero => "UNDER_ZERO",
            Self::Overweight => "OVERWEIGHT",
            Self::Disabled => "DISABLED",
            Self::AlreadyDisabled => "ALREADY_DISABLED",
            Self::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }

    /// Default human description for the code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::DeviceOffline => "Device is offline",
            Self::DeviceBusy => "Device is busy",
            Self::Timeout => "Device did not respond in time",
            Self::ClientCancelled => "Request was cancelled",
            Self::MicrTimeout => "Timed out reading MICR line",
            Self::BadData => "Device read invalid data",
            Self::InvalidFormat => "Invalid format for this device",
            Self::HardwareError => "Device hardware error",
            Self::CoverOpen => "Printer cover is open",
            Self::OutOfPaper => "Printer is out of paper",
            Self::IllegalOperation => "Operation not allowed in current device state",
            Self::NeedsZeroing => "Scale needs to be zeroed",
            Self::UnderZero => "Scale weight is under zero",
            Self::Overweight => "Scale weight exceeds capacity",
            Self::Disabled => "Device was disabled",
            Self::AlreadyDisabled => "No request in progress",
            Self::UnexpectedError => "Unexpected device error",
        }
    }

    /// HTTP status analogue for the code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::DeviceOffline | Self::AlreadyDisabled => 404,
            Self::DeviceBusy => 409,
            Self::Timeout | Self::ClientCancelled | Self::MicrTimeout => 408,
            Self::BadData
            | Self::InvalidFormat
            | Self::NeedsZeroing
            | Self::UnderZero
            | Self::Overweight => 400,
            Self::Disabled => 204,
            Self::HardwareError
            | Self::CoverOpen
            | Self::OutOfPaper
            | Self::IllegalOperation
            | Self::UnexpectedError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, client-facing device failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {description}")]
pub struct DeviceError {
    /// Stable code from the closed taxonomy.
    pub code: ErrorCode,

    /// Human-readable description.
    pub description: String,
}

impl DeviceError {
    /// Create an error with the code's default description.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            description: code.description().to_string(),
        }
    }

    /// Create an error with a custom description.
    pub fn with_description(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    /// Device is offline.
    pub fn offline() -> Self {
        Self::new(ErrorCode::DeviceOffline)
    }

    /// Device is busy.
    pub fn busy() -> Self {
        Self::new(ErrorCode::DeviceBusy)
    }

    /// Device did not answer in time.
    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout)
    }

    /// Request cancelled by the client.
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::ClientCancelled)
    }

    /// Scanner disabled while waiting.
    pub fn disabled() -> Self {
        Self::new(ErrorCode::Disabled)
    }

    /// Nothing to cancel.
    pub fn already_disabled() -> Self {
        Self::new(ErrorCode::AlreadyDisabled)
    }

    /// Catch-all failure.
    pub fn unexpected() -> Self {
        Self::new(ErrorCode::UnexpectedError)
    }

    /// HTTP status analogue.
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl From<ErrorCode> for DeviceError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;
