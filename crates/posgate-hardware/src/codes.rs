//! Native codes of the standardized device-driver interface.
//!
//! Result codes are shared by every device category. Extended codes are
//! only meaningful together with [`E_EXTENDED`] (or, for some vendors, with
//! any code) and are interpreted per device category.

// ============================================================================
// Result codes
// ============================================================================

pub const SUCCESS: i32 = 0;
pub const E_CLOSED: i32 = 101;
pub const E_CLAIMED: i32 = 102;
pub const E_NOTCLAIMED: i32 = 103;
pub const E_NOSERVICE: i32 = 104;
pub const E_DISABLED: i32 = 105;
pub const E_ILLEGAL: i32 = 106;
pub const E_NOHARDWARE: i32 = 107;
pub const E_OFFLINE: i32 = 108;
pub const E_NOEXIST: i32 = 109;
pub const E_EXISTS: i32 = 110;
pub const E_FAILURE: i32 = 111;
pub const E_TIMEOUT: i32 = 112;
pub const E_BUSY: i32 = 113;
pub const E_EXTENDED: i32 = 114;

// ============================================================================
// Power status updates
// ============================================================================

pub const SUE_POWER_ONLINE: i32 = 2001;
pub const SUE_POWER_OFF: i32 = 2002;
pub const SUE_POWER_OFFLINE: i32 = 2003;
pub const SUE_POWER_OFF_OFFLINE: i32 = 2004;

// ============================================================================
// MICR extended codes
// ============================================================================

pub const EMICR_NOCHECK: i32 = 201;
pub const EMICR_CHECK: i32 = 202;
pub const EMICR_BADDATA: i32 = 203;
pub const EMICR_NODATA: i32 = 204;
pub const EMICR_BADSIZE: i32 = 205;
pub const EMICR_JAM: i32 = 206;
pub const EMICR_CHECKDIGIT: i32 = 207;
pub const EMICR_COVEROPEN: i32 = 208;

// ============================================================================
// Printer extended codes
// ============================================================================

pub const EPTR_COVER_OPEN: i32 = 201;
pub const EPTR_JRN_EMPTY: i32 = 202;
pub const EPTR_REC_EMPTY: i32 = 203;
pub const EPTR_SLP_EMPTY: i32 = 204;
pub const EPTR_SLP_FORM: i32 = 205;
pub const EPTR_TOOBIG: i32 = 206;
pub const EPTR_BADFORMAT: i32 = 207;

// ============================================================================
// Scale extended codes
// ============================================================================

pub const ESCAL_OVERWEIGHT: i32 = 201;
pub const ESCAL_UNDER_ZERO: i32 = 202;
pub const ESCAL_SAME_WEIGHT: i32 = 203;

/// Vendor code reported by scales that must be re-zeroed before weighing.
pub const ESCAL_NEEDS_ZEROING: i32 = -20;

// ============================================================================
// Scan data types
// ============================================================================

pub const SCAN_SDT_UPCA: i32 = 101;
pub const SCAN_SDT_UPCE: i32 = 102;
pub const SCAN_SDT_EAN8: i32 = 103;
pub const SCAN_SDT_EAN13: i32 = 104;
pub const SCAN_SDT_ITF: i32 = 106;
pub const SCAN_SDT_CODE39: i32 = 108;
pub const SCAN_SDT_CODE128: i32 = 110;
pub const SCAN_SDT_RSS14: i32 = 131;
pub const SCAN_SDT_PDF417: i32 = 201;
pub const SCAN_SDT_QRCODE: i32 = 204;
pub const SCAN_SDT_UNKNOWN: i32 = 0;
