//! Simulated receipt/slip printer.

use super::lifecycle::{MockControl, MockCore, impl_simulator_control, lock};
use crate::DriverResult;
use crate::codes;
use crate::error::DriverError;
use crate::events::DriverEvent;
use crate::traits::{DeviceDriver, PrinterDriver};
use posgate_core::{DeviceKind, PrintStation};
use std::time::Duration;
use tokio::sync::mpsc;

/// One thing the simulated printer has put on paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintedOutput {
    Text { station: PrintStation, text: String },
    Barcode { station: PrintStation, data: String, height: u16 },
    Cut { percentage: u8 },
}

#[derive(Debug, Default)]
pub(crate) struct PrinterState {
    output: Vec<PrintedOutput>,
    cover_open: bool,
    receipt_empty: bool,
    slip_empty: bool,
}

impl PrinterState {
    fn check_station(&self, name: &str, station: PrintStation) -> DriverResult<()> {
        if self.cover_open {
            return Err(DriverError::extended(
                codes::EPTR_COVER_OPEN,
                format!("{name} cover is open"),
            ));
        }
        match station {
            PrintStation::Receipt if self.receipt_empty => Err(DriverError::extended(
                codes::EPTR_REC_EMPTY,
                format!("{name} is out of receipt paper"),
            )),
            PrintStation::Slip if self.slip_empty => Err(DriverError::extended(
                codes::EPTR_SLP_EMPTY,
                format!("{name} has no slip inserted"),
            )),
            _ => Ok(()),
        }
    }
}

/// Simulated printer that records everything it prints.
#[derive(Debug)]
pub struct MockPrinter {
    core: MockCore<PrinterState>,
}

impl MockPrinter {
    /// Create a printer and the handle that inspects it.
    pub fn new(name: impl Into<String>) -> (Self, MockPrinterHandle) {
        let (core, control) = MockCore::new(name, DeviceKind::Printer);
        (Self { core }, MockPrinterHandle { control })
    }

    fn output(&self, station: PrintStation, output: PrintedOutput) -> DriverResult<()> {
        self.core.command()?;
        let mut state = lock(&self.core.state);
        state.ext.check_station(&self.core.name, station)?;
        state.ext.output.push(output);
        Ok(())
    }
}

impl DeviceDriver for MockPrinter {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> DeviceKind {
        self.core.kind
    }

    async fn open(&mut self) -> DriverResult<()> {
        self.core.open()
    }

    async fn claim(&mut self, _timeout: Duration) -> DriverResult<()> {
        self.core.claim()
    }

    async fn set_device_enabled(&mut self, enabled: bool) -> DriverResult<()> {
        self.core.set_device_enabled(enabled).await
    }

    async fn release(&mut self) -> DriverResult<()> {
        self.core.release()
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.core.close()
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<DriverEvent>> {
        self.core.take_events()
    }
}

impl PrinterDriver for MockPrinter {
    async fn print_normal(&mut self, station: PrintStation, text: &str) -> DriverResult<()> {
        self.output(
            station,
            PrintedOutput::Text {
                station,
                text: text.to_string(),
            },
        )
    }

    async fn print_barcode(
        &mut self,
        station: PrintStation,
        data: &str,
        height: u16,
    ) -> DriverResult<()> {
        if data.is_empty() || height == 0 {
            return Err(DriverError::new(codes::E_ILLEGAL, "Barcode needs data and height"));
        }
        self.output(
            station,
            PrintedOutput::Barcode {
                station,
                data: data.to_string(),
                height,
            },
        )
    }

    async fn cut_paper(&mut self, percentage: u8) -> DriverResult<()> {
        if percentage > 100 {
            return Err(DriverError::new(codes::E_ILLEGAL, "Cut percentage above 100"));
        }
        self.output(PrintStation::Receipt, PrintedOutput::Cut { percentage })
    }
}

/// Control handle for a [`MockPrinter`].
#[derive(Debug, Clone)]
pub struct MockPrinterHandle {
    control: MockControl<PrinterState>,
}

impl MockPrinterHandle {
    /// Everything printed so far.
    pub fn output(&self) -> Vec<PrintedOutput> {
        lock(&self.control.state).ext.output.clone()
    }

    /// Open or close the cover.
    pub fn set_cover_open(&self, open: bool) {
        lock(&self.control.state).ext.cover_open = open;
    }

    /// Run the receipt roll out, or refill it.
    pub fn set_receipt_empty(&self, empty: bool) {
        lock(&self.control.state).ext.receipt_empty = empty;
    }

    /// Remove or insert the slip form.
    pub fn set_slip_empty(&self, empty: bool) {
        lock(&self.control.state).ext.slip_empty = empty;
    }
}

impl_simulator_control!(MockPrinterHandle);
