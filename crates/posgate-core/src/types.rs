use crate::constants::LINE_DISPLAY_WIDTH;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical kind of a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Scanner,
    Scale,
    CheckReader,
    LineDisplay,
    Printer,
}

impl DeviceKind {
    /// Path segment used by the HTTP surface (`/v1/{segment}/...`).
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Scanner => "scanner",
            Self::Scale => "scale",
            Self::CheckReader => "check",
            Self::LineDisplay => "linedisplay",
            Self::Printer => "printer",
        }
    }

    /// Resolve a kind from its path segment.
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "scanner" => Some(Self::Scanner),
            "scale" => Some(Self::Scale),
            "check" => Some(Self::CheckReader),
            "linedisplay" => Some(Self::LineDisplay),
            "printer" => Some(Self::Printer),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scanner => write!(f, "Scanner"),
            Self::Scale => write!(f, "Scale"),
            Self::CheckReader => write!(f, "CheckReader"),
            Self::LineDisplay => write!(f, "LineDisplay"),
            Self::Printer => write!(f, "Printer"),
        }
    }
}

/// Physical form of a barcode scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScannerType {
    /// Counter-mounted scanner.
    Flatbed,

    /// Hand-held scanner. Prone to becoming unresponsive after repeated
    /// enable/disable cycles.
    Handheld,
}

impl fmt::Display for ScannerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flatbed => write!(f, "FLATBED"),
            Self::Handheld => write!(f, "HANDHELD"),
        }
    }
}

/// Which scanners take part in a scan race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanTarget {
    Flatbed,
    Handheld,
    Both,
}

impl ScanTarget {
    /// Whether a scanner of `scanner_type` takes part in this race.
    pub fn includes(&self, scanner_type: ScannerType) -> bool {
        match self {
            Self::Both => true,
            Self::Flatbed => scanner_type == ScannerType::Flatbed,
            Self::Handheld => scanner_type == ScannerType::Handheld,
        }
    }
}

impl std::str::FromStr for ScanTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FLATBED" => Ok(Self::Flatbed),
            "HANDHELD" => Ok(Self::Handheld),
            "BOTH" => Ok(Self::Both),
            other => Err(format!("Unknown scanner type: {other}")),
        }
    }
}

/// Connection state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// Connected and executing a command.
    Busy,
}

impl ConnectionState {
    /// Connected or busy.
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

/// Outcome of a connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionResult {
    /// The session transitioned into Connected.
    Connected,

    /// The session was already connected; nothing happened.
    AlreadyConnected,

    /// The driver refused; the session stays disconnected.
    NotConnected,
}

impl ConnectionResult {
    /// Whether the device is connected after the attempt.
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::NotConnected)
    }
}

/// Connection-changed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub device: String,
    pub state: ConnectionState,
}

/// Health of a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Ready,
    NotReady,
}

impl From<bool> for HealthStatus {
    fn from(connected: bool) -> Self {
        if connected { Self::Ready } else { Self::NotReady }
    }
}

/// Cached health of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub device_name: String,
    pub health_status: HealthStatus,
    pub cached_at: DateTime<Utc>,
}

impl HealthRecord {
    /// Record the given status as of now.
    pub fn now(device_name: impl Into<String>, health_status: HealthStatus) -> Self {
        Self {
            device_name: device_name.into(),
            health_status,
            cached_at: Utc::now(),
        }
    }
}

/// Barcode symbology reported by a scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Symbology {
    UpcA,
    UpcE,
    Ean8,
    Ean13,
    Code39,
    Code128,
    Interleaved2of5,
    Pdf417,
    QrCode,
    DataBar,
    Unknown,
}

/// Decoded barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Barcode {
    pub data: String,
    pub symbology: Symbology,
    /// Name of the scanner that produced the read.
    pub scanner: String,
    pub scanned_at: DateTime<Utc>,
}

/// Check type as read from the MICR line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
    Personal,
    Business,
    Unknown,
}

/// MICR line of a check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MicrData {
    pub raw_data: String,
    pub account_number: String,
    pub bank_number: String,
    pub transit_number: String,
    pub serial_number: String,
    pub check_type: Option<CheckType>,
    pub country_code: Option<String>,
}

/// Scale reading in device units (thousandths with one extra digit of
/// precision, e.g. `12345` means 12.345).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weight(pub u32);

impl Weight {
    /// Format as a two-decimal string: the last digit is dropped and the
    /// remainder rendered as hundredths. `12345` becomes `"12.34"`.
    pub fn formatted(&self) -> String {
        let hundredths = self.0 / 10;
        format!("{}.{:02}", hundredths / 100, hundredths % 100)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

/// Live status reported by a scale alongside a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleStatus {
    Stable,
    Unstable,
    Zero,
    Overweight,
    UnderZero,
    NeedsZeroing,
    NotReady,
}

/// One live-weight sample pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveWeight {
    /// Formatted weight, absent when the status carries no weight.
    pub weight: Option<String>,
    pub status: ScaleStatus,
}

impl LiveWeight {
    pub fn new(weight: Option<Weight>, status: ScaleStatus) -> Self {
        Self {
            weight: weight.map(|w| w.formatted()),
            status,
        }
    }
}

/// Printer station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrintStation {
    #[default]
    Receipt,
    Slip,
}

/// One element of a print job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrintItem {
    Text { text: String },
    Barcode { data: String, height: Option<u16> },
    Feed { lines: u8 },
    Cut,
}

/// Structured print job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrintJob {
    #[serde(default)]
    pub station: PrintStation,
    pub items: Vec<PrintItem>,
}

/// Right-pad or truncate `text` to exactly [`LINE_DISPLAY_WIDTH`] characters.
/// `None` becomes a blank row.
pub fn fit_display_line(text: Option<&str>) -> String {
    let text = text.unwrap_or("");
    let mut line: String = text.chars().take(LINE_DISPLAY_WIDTH).collect();
    let len = line.chars().count();
    line.extend(std::iter::repeat_n(' ', LINE_DISPLAY_WIDTH - len));
    line
}
