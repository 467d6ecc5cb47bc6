//! Operator-guided calibration procedures
//!
//! Each procedure owns a [`StateMachine`] and the context its handlers work
//! on. Hardware is reached only through the [`Board`] handed to the
//! procedure at construction.
//!
//! - [`input`] - capture the analog input transfer curve
//! - [`output`] - search the DAC codes for 0..10 V on each output
//! - [`monitor`] - live calibrated reading of the analog input
//! - [`generator`] - drive the outputs to a knob-set voltage

pub mod generator;
pub mod input;
pub mod monitor;
pub mod output;

use core::fmt::Write;

use heapless::String;

use eurocal_display::{DisplayBackend, DisplayExt};
use eurocal_hal::{AnalogInput, DacError, DacOutput, DelayNs, FlashStorage, PowerSense};

use crate::calibration::{CalibrationError, SearchError};
use crate::config::StoreError;
use crate::state::{Action, Dispatch, MachineError};

pub use generator::{GeneratorContext, GeneratorProcedure, GeneratorStep};
pub use input::{InputContext, InputProcedure, InputStep};
pub use monitor::{MonitorContext, MonitorProcedure, MonitorStep, VoltageRange};
pub use output::{OutputContext, OutputProcedure, OutputStep};

/// Formatted display line
///
/// Longer than the display on purpose; the display truncates.
pub type Line = String<32>;

/// Hardware available to a procedure
pub trait Board {
    /// Analog input the calibration is measured on
    type Adc: AnalogInput;
    /// DAC driving the outputs
    type Dac: DacOutput;
    /// Text display
    type Display: DisplayBackend;
    /// Persistent storage for the results
    type Storage: FlashStorage;
    /// Blocking delay source
    type Delay: DelayNs;
    /// Supply sensing
    type Power: PowerSense;

    fn adc(&mut self) -> &mut Self::Adc;
    fn dac(&mut self) -> &mut Self::Dac;
    fn display(&mut self) -> &mut Self::Display;
    fn storage(&mut self) -> &mut Self::Storage;
    fn delay(&mut self) -> &mut Self::Delay;
    fn power(&self) -> &Self::Power;

    /// Return the hardware to its power-on state
    ///
    /// Drives every DAC channel to code 0 and clears the display.
    fn reinitialize(&mut self) {
        if let Err(e) = self.dac().zero_all() {
            warn!("Failed to zero DAC outputs: {:?}", e);
        }
        let display = self.display();
        if let Err(e) = display.clear().and_then(|()| display.flush()) {
            warn!("Failed to clear display: {:?}", e);
        }
    }
}

/// A procedure the control loop can drive
pub trait Procedure {
    /// Procedure state identifier
    type Step: Copy + PartialEq;

    /// Show the first screen and enter the initial state
    fn start(&mut self) -> Result<(), MachineError>;

    /// Queue an action, replacing any action not yet executed
    fn do_action(&mut self, action: Action);

    /// Execute the pending action
    fn execute(&mut self) -> Dispatch<Self::Step, Action>;

    /// Current state, `None` before `start`
    fn step(&self) -> Option<Self::Step>;

    /// Check if the current screen shows live readings
    fn wants_refresh(&self) -> bool {
        false
    }

    /// Latest knob positions, reported before every action
    fn update_knobs(&mut self, _knobs: [u8; 2]) {}

    /// Knob resolutions to read with, `None` for the control loop's own
    fn knob_resolutions(&self) -> Option<[u8; 2]> {
        None
    }
}

/// Errors that end a procedure on its error screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcedureError {
    /// Captured data does not form a valid calibration
    Calibration(CalibrationError),
    /// DAC search failed
    Search(SearchError),
    /// Loading or saving the results failed
    Store(StoreError),
    /// Writing the DAC failed outside a search
    Dac(DacError),
}

impl ProcedureError {
    /// Two short display lines describing the error
    pub fn lines(&self) -> [&'static str; 2] {
        match self {
            ProcedureError::Calibration(e) => e.operator_message(),
            ProcedureError::Search(SearchError::Saturated { .. }) => ["Output cannot", "reach target"],
            ProcedureError::Search(SearchError::Dac(_)) | ProcedureError::Dac(_) => {
                ["DAC write", "failed"]
            }
            ProcedureError::Store(_) => ["Saving values", "failed"],
        }
    }
}

impl From<CalibrationError> for ProcedureError {
    fn from(e: CalibrationError) -> Self {
        ProcedureError::Calibration(e)
    }
}

impl From<SearchError> for ProcedureError {
    fn from(e: SearchError) -> Self {
        ProcedureError::Search(e)
    }
}

impl From<StoreError> for ProcedureError {
    fn from(e: StoreError) -> Self {
        ProcedureError::Store(e)
    }
}

impl From<DacError> for ProcedureError {
    fn from(e: DacError) -> Self {
        ProcedureError::Dac(e)
    }
}

/// Writer that drops whatever does not fit
struct Truncating<'a>(&'a mut Line);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Format a display line
pub(crate) fn line(args: core::fmt::Arguments<'_>) -> Line {
    let mut text = Line::new();
    let _ = Truncating(&mut text).write_fmt(args);
    text
}

/// Show three centred lines, logging display failures
pub(crate) fn show<B: Board>(board: &mut B, line1: &str, line2: &str, line3: &str) {
    if let Err(e) = board.display().show_lines(line1, line2, line3) {
        warn!("Display update failed: {:?}", e);
    }
}

pub(crate) fn show_power_reminder<B: Board>(board: &mut B) {
    if board.power().usb_powered() {
        show(board, "Confirm rack", "power is ON", "Back    Confirm");
    } else {
        show(board, "Rack power", "is ON.", "       Continue");
    }
}

pub(crate) fn show_done<B: Board>(board: &mut B) {
    show(board, "All done!", " ", "B2 to restart");
}

pub(crate) fn show_error<B: Board>(board: &mut B, error: &ProcedureError) {
    let [first, second] = error.lines();
    show(board, first, second, "B2 to restart");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_calibration_message() {
        let error = ProcedureError::from(CalibrationError::IncompleteCalibration);
        assert_eq!(error.lines(), ["Redo with rack", "power turned on"]);
    }

    #[test]
    fn test_saturation_message() {
        let error = ProcedureError::from(SearchError::Saturated { code: 4095 });
        assert_eq!(error.lines()[1], "reach target");
    }

    #[test]
    fn test_line_truncates_on_overflow() {
        let text = line(format_args!("{}", "0123456789abcdefghijklmnopqrstuvwxyz"));
        assert_eq!(text.len(), 32);
        assert!(text.starts_with("0123456789"));
    }
}
