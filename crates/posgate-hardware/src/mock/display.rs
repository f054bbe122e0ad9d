//! Simulated two-row line display.

use super::lifecycle::{MockControl, MockCore, impl_simulator_control, lock};
use crate::DriverResult;
use crate::codes;
use crate::error::DriverError;
use crate::events::DriverEvent;
use crate::traits::{DeviceDriver, LineDisplayDriver};
use posgate_core::DeviceKind;
use posgate_core::constants::LINE_DISPLAY_WIDTH;
use std::time::Duration;
use tokio::sync::mpsc;

const ROWS: usize = 2;

#[derive(Debug)]
pub(crate) struct DisplayState {
    rows: [String; ROWS],
    writes: usize,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            rows: std::array::from_fn(|_| blank()),
            writes: 0,
        }
    }
}

fn blank() -> String {
    " ".repeat(LINE_DISPLAY_WIDTH)
}

/// Simulated line display with two rows of [`LINE_DISPLAY_WIDTH`] cells.
#[derive(Debug)]
pub struct MockLineDisplay {
    core: MockCore<DisplayState>,
}

impl MockLineDisplay {
    /// Create a display and the handle that inspects it.
    pub fn new(name: impl Into<String>) -> (Self, MockLineDisplayHandle) {
        let (core, control) = MockCore::new(name, DeviceKind::LineDisplay);
        (Self { core }, MockLineDisplayHandle { control })
    }
}

impl DeviceDriver for MockLineDisplay {
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

impl LineDisplayDriver for MockLineDisplay {
    async fn clear_text(&mut self) -> DriverResult<()> {
        self.core.command()?;
        let mut state = lock(&self.core.state);
        state.ext.rows = std::array::from_fn(|_| blank());
        Ok(())
    }

    async fn display_text_at(&mut self, row: u8, column: u8, text: &str) -> DriverResult<()> {
        self.core.command()?;

        let row = usize::from(row);
        let column = usize::from(column);
        if row >= ROWS || column >= LINE_DISPLAY_WIDTH {
            return Err(DriverError::new(
                codes::E_ILLEGAL,
                format!("Position {row},{column} is outside the display"),
            ));
        }

        let mut state = lock(&self.core.state);
        let cells: Vec<char> = state.ext.rows[row]
            .chars()
            .take(column)
            .chain(text.chars())
            .chain(state.ext.rows[row].chars().skip(column + text.chars().count()))
            .take(LINE_DISPLAY_WIDTH)
            .collect();
        state.ext.rows[row] = cells.into_iter().collect();
        state.ext.writes += 1;
        Ok(())
    }
}

/// Inspection handle for a [`MockLineDisplay`].
#[derive(Debug, Clone)]
pub struct MockLineDisplayHandle {
    control: MockControl<DisplayState>,
}

impl MockLineDisplayHandle {
    /// Current contents, one string per row.
    pub fn rows(&self) -> Vec<String> {
        lock(&self.control.state).ext.rows.to_vec()
    }

    /// Number of row writes so far.
    pub fn writes(&self) -> usize {
        lock(&self.control.state).ext.writes
    }
}

impl_simulator_control!(MockLineDisplayHandle);
