//! Simulated hardware behind the gateway.
//!
//! Simulated drivers are the only drivers the gateway ships. [`build_devices`]
//! creates one per configured device, registers the driver halves with a
//! [`DeviceRegistry`] and keeps the control halves in a [`Simulator`] so the
//! `/v1/simulator` routes can inject scans, weights, checks, power
//! transitions and error callbacks.

use crate::config::GatewayConfig;
use crate::error::{ApiError, ApiResult};
use posgate_core::{DeviceError, DeviceKind, ErrorCode};
use posgate_devices::DeviceRegistry;
use posgate_hardware::mock::{
    MockCheckReader, MockCheckReaderHandle, MockLineDisplay, MockLineDisplayHandle, MockPrinter,
    MockPrinterHandle, MockScale, MockScaleHandle, MockScanner, MockScannerHandle,
    SimulatorControl,
};
use posgate_hardware::{
    AnyCheckReader, AnyLineDisplay, AnyPrinter, AnyScale, AnyScanner, DriverError, PowerState,
};
use tracing::info;

/// Control handles of every simulated device.
#[derive(Debug, Default)]
pub struct Simulator {
    scanners: Vec<MockScannerHandle>,
    scale: Option<MockScaleHandle>,
    check: Option<MockCheckReaderHandle>,
    display: Option<MockLineDisplayHandle>,
    printer: Option<MockPrinterHandle>,
}

/// Build the registry for `config`. Must run inside a Tokio runtime.
pub fn build_devices(config: &GatewayConfig) -> (DeviceRegistry, Simulator) {
    let mut builder = DeviceRegistry::builder().timing(config.timing.to_device_timing());
    let mut simulator = Simulator::default();

    for scanner in &config.scanners {
        let (device, handle) = MockScanner::new(scanner.name.clone(), scanner.scanner_type);
        builder = builder.scanner(AnyScanner::Mock(device));
        simulator.scanners.push(handle);
    }
    if config.scale.enabled {
        let (device, handle) = MockScale::new(config.scale.name_or(DeviceKind::Scale));
        builder = builder.scale(AnyScale::Mock(device));
        simulator.scale = Some(handle);
    }
    if config.check.enabled {
        let (device, handle) = MockCheckReader::new(config.check.name_or(DeviceKind::CheckReader));
        builder = builder.check_reader(AnyCheckReader::Mock(device));
        simulator.check = Some(handle);
    }
    if config.linedisplay.enabled {
        let (device, handle) =
            MockLineDisplay::new(config.linedisplay.name_or(DeviceKind::LineDisplay));
        builder = builder.line_display(AnyLineDisplay::Mock(device));
        simulator.display = Some(handle);
    }
    if config.printer.enabled {
        let (device, handle) = MockPrinter::new(config.printer.name_or(DeviceKind::Printer));
        builder = builder.printer(AnyPrinter::Mock(device));
        simulator.printer = Some(handle);
    }

    info!(scanners = simulator.scanners.len(), "Simulated devices created");
    (builder.build(), simulator)
}

fn missing(kind: DeviceKind) -> ApiError {
    ApiError::not_found(format!("No simulated {} is configured", kind.path_segment()))
}

/// Map a driver failure from a simulator call.
pub(crate) fn simulation_error(error: DriverError) -> ApiError {
    ApiError(DeviceError::with_description(
        ErrorCode::UnexpectedError,
        error.to_string(),
    ))
}

/// One simulated device, whatever its kind.
enum Target<'a> {
    Scanner(&'a MockScannerHandle),
    Scale(&'a MockScaleHandle),
    Check(&'a MockCheckReaderHandle),
    Display(&'a MockLineDisplayHandle),
    Printer(&'a MockPrinterHandle),
}

impl Target<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Scanner(h) => h.name(),
            Self::Scale(h) => h.name(),
            Self::Check(h) => h.name(),
            Self::Display(h) => h.name(),
            Self::Printer(h) => h.name(),
        }
    }

    async fn power(&self, power: PowerState) -> Result<(), DriverError> {
        match self {
            Self::Scanner(h) => h.power(power).await,
            Self::Scale(h) => h.power(power).await,
            Self::Check(h) => h.power(power).await,
            Self::Display(h) => h.power(power).await,
            Self::Printer(h) => h.power(power).await,
        }
    }

    async fn inject_error(&self, code: i32, extended: i32) -> Result<(), DriverError> {
        match self {
            Self::Scanner(h) => h.inject_error(code, extended).await,
            Self::Scale(h) => h.inject_error(code, extended).await,
            Self::Check(h) => h.inject_error(code, extended).await,
            Self::Display(h) => h.inject_error(code, extended).await,
            Self::Printer(h) => h.inject_error(code, extended).await,
        }
    }
}

impl Simulator {
    pub fn scanner(&self, name: &str) -> ApiResult<&MockScannerHandle> {
        self.scanners
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| ApiError::not_found(format!("No simulated scanner named '{name}'")))
    }

    pub fn scanners(&self) -> &[MockScannerHandle] {
        &self.scanners
    }

    pub fn scale(&self) -> ApiResult<&MockScaleHandle> {
        self.scale.as_ref().ok_or_else(|| missing(DeviceKind::Scale))
    }

    pub fn check_reader(&self) -> ApiResult<&MockCheckReaderHandle> {
        self.check.as_ref().ok_or_else(|| missing(DeviceKind::CheckReader))
    }

    pub fn line_display(&self) -> ApiResult<&MockLineDisplayHandle> {
        self.display.as_ref().ok_or_else(|| missing(DeviceKind::LineDisplay))
    }

    pub fn printer(&self) -> ApiResult<&MockPrinterHandle> {
        self.printer.as_ref().ok_or_else(|| missing(DeviceKind::Printer))
    }

    /// Devices of `kind`, narrowed to `name` when given.
    fn targets(&self, kind: DeviceKind, name: Option<&str>) -> ApiResult<Vec<Target<'_>>> {
        let all: Vec<Target<'_>> = match kind {
            DeviceKind::Scanner => self.scanners.iter().map(Target::Scanner).collect(),
            DeviceKind::Scale => vec![Target::Scale(self.scale()?)],
            DeviceKind::CheckReader => vec![Target::Check(self.check_reader()?)],
            DeviceKind::LineDisplay => vec![Target::Display(self.line_display()?)],
            DeviceKind::Printer => vec![Target::Printer(self.printer()?)],
        };

        let selected: Vec<_> = all
            .into_iter()
            .filter(|t| name.is_none_or(|n| t.name() == n))
            .collect();
        if selected.is_empty() {
            return Err(match name {
                Some(n) => ApiError::not_found(format!(
                    "No simulated {} named '{n}'",
                    kind.path_segment()
                )),
                None => missing(kind),
            });
        }
        Ok(selected)
    }

    /// Deliver a power status update to the selected devices. Returns how
    /// many devices received it.
    pub async fn power(
        &self,
        kind: DeviceKind,
        name: Option<&str>,
        power: PowerState,
    ) -> ApiResult<usize> {
        let targets = self.targets(kind, name)?;
        for target in &targets {
            target.power(power).await.map_err(simulation_error)?;
            info!(device = %target.name(), ?power, "Simulated power change");
        }
        Ok(targets.len())
    }

    /// Deliver an error callback to the selected devices.
    pub async fn inject_error(
        &self,
        kind: DeviceKind,
        name: Option<&str>,
        code: i32,
        extended: i32,
    ) -> ApiResult<usize> {
        let targets = self.targets(kind, name)?;
        for target in &targets {
            target
                .inject_error(code, extended)
                .await
                .map_err(simulation_error)?;
            info!(device = %target.name(), code, extended, "Simulated error event");
        }
        Ok(targets.len())
    }
}
