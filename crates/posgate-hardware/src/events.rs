//! Callback events delivered by device drivers.
//!
//! Every driver owns one bounded channel of [`DriverEvent`]s. The driver (or
//! the simulator standing in for it) is the producer; the device's event
//! bridge is the single consumer.

use crate::codes;
use bytes::Bytes;
use posgate_core::{MicrData, ScaleStatus, Weight};

/// Power state reported through a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Online,
    Off,
    Offline,
    OffOffline,
}

impl PowerState {
    /// Decode a native power status code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            codes::SUE_POWER_ONLINE => Some(Self::Online),
            codes::SUE_POWER_OFF => Some(Self::Off),
            codes::SUE_POWER_OFFLINE => Some(Self::Offline),
            codes::SUE_POWER_OFF_OFFLINE => Some(Self::OffOffline),
            _ => None,
        }
    }

    /// Native status code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Online => codes::SUE_POWER_ONLINE,
            Self::Off => codes::SUE_POWER_OFF,
            Self::Offline => codes::SUE_POWER_OFFLINE,
            Self::OffOffline => codes::SUE_POWER_OFF_OFFLINE,
        }
    }

    /// Any of the powered-down variants.
    pub fn is_offline(&self) -> bool {
        !matches!(self, Self::Online)
    }
}

/// Status-update callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Power transition.
    Power(PowerState),

    /// Live scale sample.
    Scale {
        status: ScaleStatus,
        weight: Option<Weight>,
    },

    /// Status code this layer does not interpret.
    Other(i32),
}

/// Data callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEvent {
    /// Scanner label with its native scan data type.
    Scan { label: Bytes, data_type: i32 },

    /// MICR line read from a check.
    Micr(MicrData),

    /// Stable weight delivered by an asynchronous read.
    Weight(Weight),
}

/// Error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorEvent {
    pub code: i32,
    pub extended: i32,
}

impl From<&crate::DriverError> for ErrorEvent {
    fn from(error: &crate::DriverError) -> Self {
        Self {
            code: error.code,
            extended: error.extended,
        }
    }
}

/// Any callback a driver can deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Status(StatusUpdate),
    Data(DataEvent),
    Error(ErrorEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_state_codes_round_trip() {
        for state in [
            PowerState::Online,
            PowerState::Off,
            PowerState::Offline,
            PowerState::OffOffline,
        ] {
            assert_eq!(PowerState::from_code(state.code()), Some(state));
        }
        assert_eq!(PowerState::from_code(42), None);
    }

    #[test]
    fn test_power_state_offline_variants() {
        assert!(!PowerState::Online.is_offline());
        assert!(PowerState::Off.is_offline());
        assert!(PowerState::Offline.is_offline());
        assert!(PowerState::OffOffline.is_offline());
    }
}
