//! Translation of native driver codes into the client-facing taxonomy.
//!
//! Each device category checks its own tables in a fixed precedence order
//! (result code first or extended code first), then the generic result-code
//! table. A code no table knows becomes [`ErrorCode::UnexpectedError`].
//!
//! | Category | Precedence |
//! |---|---|
//! | Check reader | extended, code, generic |
//! | Scale | extended, code, generic |
//! | Printer | code, extended, generic |
//! | Scanner | code, extended, generic |
//! | Line display | generic |

use crate::codes::*;
use crate::error::DriverError;
use crate::events::ErrorEvent;
use posgate_core::{DeviceError, DeviceKind, ErrorCode, Symbology};

/// Map a native code pair for a device category.
pub fn map_codes(kind: DeviceKind, code: i32, extended: i32) -> ErrorCode {
    let specific = match kind {
        DeviceKind::CheckReader => check_extended(extended).or_else(|| check_code(code)),
        DeviceKind::Scale => scale_extended(extended).or_else(|| scale_code(code)),
        DeviceKind::Printer => printer_code(code).or_else(|| printer_extended(extended)),
        DeviceKind::Scanner => scanner_code(code),
        DeviceKind::LineDisplay => None,
    };

    specific
        .or_else(|| generic_code(code))
        .unwrap_or(ErrorCode::UnexpectedError)
}

/// Map a driver error, keeping the driver message as the description for
/// codes that would otherwise be opaque.
pub fn map_error(kind: DeviceKind, error: &DriverError) -> DeviceError {
    let code = map_codes(kind, error.code, error.extended);
    match code {
        ErrorCode::UnexpectedError | ErrorCode::HardwareError => {
            DeviceError::with_description(code, error.message.clone())
        }
        _ => DeviceError::new(code),
    }
}

/// Map an error callback.
pub fn map_event(kind: DeviceKind, event: &ErrorEvent) -> DeviceError {
    DeviceError::new(map_codes(kind, event.code, event.extended))
}

fn generic_code(code: i32) -> Option<ErrorCode> {
    match code {
        E_BUSY => Some(ErrorCode::DeviceBusy),
        E_OFFLINE | E_CLOSED | E_NOTCLAIMED | E_NOHARDWARE | E_DISABLED | E_NOSERVICE
        | E_NOEXIST => Some(ErrorCode::DeviceOffline),
        E_FAILURE => Some(ErrorCode::UnexpectedError),
        _ => None,
    }
}

fn check_extended(extended: i32) -> Option<ErrorCode> {
    match extended {
        EMICR_BADDATA | EMICR_NODATA | EMICR_BADSIZE | EMICR_CHECKDIGIT => {
            Some(ErrorCode::BadData)
        }
        EMICR_COVEROPEN | EMICR_JAM => Some(ErrorCode::HardwareError),
        _ => None,
    }
}

fn check_code(code: i32) -> Option<ErrorCode> {
    match code {
        E_TIMEOUT => Some(ErrorCode::ClientCancelled),
        _ => None,
    }
}

fn printer_code(code: i32) -> Option<ErrorCode> {
    match code {
        E_ILLEGAL => Some(ErrorCode::IllegalOperation),
        E_TIMEOUT => Some(ErrorCode::MicrTimeout),
        _ => None,
    }
}

fn printer_extended(extended: i32) -> Option<ErrorCode> {
    match extended {
        EPTR_COVER_OPEN => Some(ErrorCode::CoverOpen),
        EPTR_REC_EMPTY => Some(ErrorCode::OutOfPaper),
        EPTR_SLP_EMPTY => Some(ErrorCode::InvalidFormat),
        _ => None,
    }
}

fn scale_extended(extended: i32) -> Option<ErrorCode> {
    match extended {
        ESCAL_NEEDS_ZEROING => Some(ErrorCode::NeedsZeroing),
        ESCAL_UNDER_ZERO => Some(ErrorCode::UnderZero),
        ESCAL_OVERWEIGHT => Some(ErrorCode::Overweight),
        _ => None,
    }
}

fn scale_code(code: i32) -> Option<ErrorCode> {
    match code {
        E_TIMEOUT => Some(ErrorCode::Timeout),
        _ => None,
    }
}

fn scanner_code(code: i32) -> Option<ErrorCode> {
    match code {
        E_DISABLED | E_TIMEOUT => Some(ErrorCode::Disabled),
        E_CLOSED => Some(ErrorCode::DeviceOffline),
        _ => None,
    }
}

/// Decode a native scan data type.
pub fn symbology(data_type: i32) -> Symbology {
    match data_type {
        SCAN_SDT_UPCA => Symbology::UpcA,
        SCAN_SDT_UPCE => Symbology::UpcE,
        SCAN_SDT_EAN8 => Symbology::Ean8,
        SCAN_SDT_EAN13 => Symbology::Ean13,
        SCAN_SDT_ITF => Symbology::Interleaved2of5,
        SCAN_SDT_CODE39 => Symbology::Code39,
        SCAN_SDT_CODE128 => Symbology::Code128,
        SCAN_SDT_RSS14 => Symbology::DataBar,
        SCAN_SDT_PDF417 => Symbology::Pdf417,
        SCAN_SDT_QRCODE => Symbology::QrCode,
        _ => Symbology::Unknown,
    }
}
