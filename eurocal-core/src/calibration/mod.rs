//! Piecewise-linear calibration model
//!
//! Pure math, no I/O:
//!
//! - [`table`] - ordered (nominal volts, raw code) pairs
//! - [`input`] - raw ADC reading to volts and back
//! - [`output`] - volts to DAC code
//! - [`search`] - coarse-to-fine DAC code convergence
//! - [`adjust`] - operator fine-tuning of nominal values

pub mod adjust;
pub mod input;
pub mod output;
pub mod search;
pub mod table;

pub use adjust::FineTune;
pub use input::InputCalibration;
pub use output::{DacCalibration, DAC_POINTS};
pub use search::{converge, step_for, Converged, Probe, SearchConfig, SearchError, SearchProgress};
pub use table::{CalibrationError, CalibrationTable, MAX_POINTS, MAX_VOLTAGE, MIN_VOLTAGE};
