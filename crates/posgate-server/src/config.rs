//! Gateway configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) yields a gateway with two simulated scanners, a scale, a check
//! reader, a line display and a printer.
//!
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1:8080"
//! log_level = "info"
//!
//! [timing]
//! lock_timeout_ms = 10000
//! scan_timeout_ms = 60000
//!
//! [[scanners]]
//! name = "Flatbed"
//! scanner_type = "FLATBED"
//!
//! [scale]
//! enabled = false
//! ```

use posgate_core::{DeviceKind, ScannerType, constants};
use posgate_devices::DeviceTiming;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub timing: TimingSettings,

    /// Scanners taking part in scan races.
    #[serde(default = "default_scanners")]
    pub scanners: Vec<ScannerSettings>,

    #[serde(default = "DeviceSettings::scale")]
    pub scale: DeviceSettings,

    #[serde(default = "DeviceSettings::check")]
    pub check: DeviceSettings,

    #[serde(default = "DeviceSettings::linedisplay")]
    pub linedisplay: DeviceSettings,

    #[serde(default = "DeviceSettings::printer")]
    pub printer: DeviceSettings,

    #[serde(default)]
    pub simulator: SimulatorSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            timing: TimingSettings::default(),
            scanners: default_scanners(),
            scale: DeviceSettings::scale(),
            check: DeviceSettings::check(),
            linedisplay: DeviceSettings::linedisplay(),
            printer: DeviceSettings::printer(),
            simulator: SimulatorSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "ServerSettings::default_log_level")]
    pub log_level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: Self::default_bind_addr(),
            log_level: Self::default_log_level(),
        }
    }
}

impl ServerSettings {
    fn default_bind_addr() -> String {
        "127.0.0.1:8080".to_string()
    }

    fn default_log_level() -> String {
        "info".to_string()
    }
}

/// Device-layer bounds, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub lock_timeout_ms: u64,
    pub claim_timeout_ms: u64,
    pub reconnect_period_ms: u64,
    pub reconnect_initial_delay_ms: u64,
    pub stable_weight_timeout_ms: u64,
    pub hang_safety_margin_ms: u64,
    pub scan_timeout_ms: u64,
    pub check_insertion_timeout_ms: u64,
    /// Cached health older than this is refreshed on a status read.
    /// Absent means cached health never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_max_age_ms: Option<u64>,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: millis(constants::LOCK_TIMEOUT),
            claim_timeout_ms: millis(constants::CLAIM_TIMEOUT),
            reconnect_period_ms: millis(constants::RECONNECT_PERIOD),
            reconnect_initial_delay_ms: millis(constants::RECONNECT_INITIAL_DELAY),
            stable_weight_timeout_ms: millis(constants::STABLE_WEIGHT_TIMEOUT),
            hang_safety_margin_ms: millis(constants::HANG_SAFETY_MARGIN),
            scan_timeout_ms: millis(constants::SCAN_TIMEOUT),
            check_insertion_timeout_ms: millis(constants::CHECK_INSERTION_TIMEOUT),
            health_max_age_ms: None,
        }
    }
}

impl TimingSettings {
    pub fn to_device_timing(&self) -> DeviceTiming {
        DeviceTiming {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            claim_timeout: Duration::from_millis(self.claim_timeout_ms),
            reconnect_period: Duration::from_millis(self.reconnect_period_ms),
            reconnect_initial_delay: Duration::from_millis(self.reconnect_initial_delay_ms),
            stable_weight_timeout: Duration::from_millis(self.stable_weight_timeout_ms),
            hang_safety_margin: Duration::from_millis(self.hang_safety_margin_ms),
            scan_timeout: Duration::from_millis(self.scan_timeout_ms),
            check_insertion_timeout: Duration::from_millis(self.check_insertion_timeout_ms),
            health_max_age: self.health_max_age_ms.map(Duration::from_millis),
        }
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("lock_timeout_ms", self.lock_timeout_ms),
            ("reconnect_period_ms", self.reconnect_period_ms),
            ("stable_weight_timeout_ms", self.stable_weight_timeout_ms),
            ("scan_timeout_ms", self.scan_timeout_ms),
            ("check_insertion_timeout_ms", self.check_insertion_timeout_ms),
        ];
        match required.iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::invalid(format!(
                "timing.{field} must be greater than 0"
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerSettings {
    pub name: String,
    pub scanner_type: ScannerType,
}

fn default_scanners() -> Vec<ScannerSettings> {
    vec![
        ScannerSettings {
            name: "Flatbed".to_string(),
            scanner_type: ScannerType::Flatbed,
        },
        ScannerSettings {
            name: "Handheld".to_string(),
            scanner_type: ScannerType::Handheld,
        },
    ]
}

/// A single-instance device category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Device name; defaults to the category's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl DeviceSettings {
    fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            enabled: true,
        }
    }

    fn scale() -> Self {
        Self::named("Scale")
    }

    fn check() -> Self {
        Self::named("Check Reader")
    }

    fn linedisplay() -> Self {
        Self::named("Line Display")
    }

    fn printer() -> Self {
        Self::named("Printer")
    }

    /// Configured name, or `kind`'s display name.
    pub fn name_or(&self, kind: DeviceKind) -> String {
        self.name.clone().unwrap_or_else(|| kind.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorSettings {
    /// Mount the `/v1/simulator` control routes.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl GatewayConfig {
    /// Load and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        tracing::info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the first standard location that exists, falling back to
    /// defaults when none does or it fails to load.
    pub fn load_or_default() -> Self {
        let candidates = [Self::default_path(), PathBuf::from("/etc/posgate/posgate.toml")];
        let Some(path) = candidates.into_iter().find(|p| p.exists()) else {
            tracing::info!("No configuration file found, using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("posgate").join("posgate.toml")
        } else {
            PathBuf::from(".config/posgate/posgate.toml")
        }
    }

    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.server.log_level.as_str()) {
            return Err(ConfigError::invalid(format!(
                "Invalid log level '{}', must be one of: {}",
                self.server.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        self.timing.validate()?;

        let mut names = HashSet::new();
        for scanner in &self.scanners {
            if scanner.name.trim().is_empty() {
                return Err(ConfigError::invalid("Scanner names must not be empty"));
            }
            if !names.insert(scanner.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "Duplicate scanner name '{}'",
                    scanner.name
                )));
            }
        }
        Ok(())
    }
}
