//! Calibration tables

use heapless::Vec;

/// Maximum number of points in a calibration table
pub const MAX_POINTS: usize = 12;

/// Lowest voltage the analog stages can represent
pub const MIN_VOLTAGE: f32 = 0.0;

/// Highest voltage the analog stages can represent
pub const MAX_VOLTAGE: f32 = 12.0;

/// Calibration table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Two consecutive points captured the same raw code
    ///
    /// Happens when a capture ran without rack power: every point reads
    /// the same value.
    IncompleteCalibration,
    /// Raw codes or nominal values decrease somewhere in the table
    NonMonotonic,
    /// Nominal and raw sequences differ in length
    LengthMismatch,
    /// Fewer than two points
    TooFewPoints,
    /// More than [`MAX_POINTS`] points
    TooManyPoints,
}

impl CalibrationError {
    /// Two short display lines telling the operator what to do
    pub fn operator_message(&self) -> [&'static str; 2] {
        match self {
            CalibrationError::IncompleteCalibration => ["Redo with rack", "power turned on"],
            CalibrationError::NonMonotonic => ["Readings not", "increasing"],
            CalibrationError::LengthMismatch
            | CalibrationError::TooFewPoints
            | CalibrationError::TooManyPoints => ["Invalid data", ""],
        }
    }
}

/// Ordered (nominal, raw) calibration points
///
/// Construction only checks the shape. Ordering is checked when a model is
/// built from the table, so a broken capture can still be inspected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationTable {
    nominal: Vec<f32, MAX_POINTS>,
    raw: Vec<u16, MAX_POINTS>,
}

impl CalibrationTable {
    /// Create a table from parallel sequences
    pub fn new(nominal: &[f32], raw: &[u16]) -> Result<Self, CalibrationError> {
        if nominal.len() != raw.len() {
            return Err(CalibrationError::LengthMismatch);
        }
        if nominal.len() < 2 {
            return Err(CalibrationError::TooFewPoints);
        }
        Ok(Self {
            nominal: Vec::from_slice(nominal).map_err(|_| CalibrationError::TooManyPoints)?,
            raw: Vec::from_slice(raw).map_err(|_| CalibrationError::TooManyPoints)?,
        })
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Always false; a table holds at least two points
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Nominal values in volts
    pub fn nominal(&self) -> &[f32] {
        &self.nominal
    }

    /// Raw codes
    pub fn raw(&self) -> &[u16] {
        &self.raw
    }

    /// Check the ordering invariant
    ///
    /// A repeated raw code is reported as
    /// [`CalibrationError::IncompleteCalibration`] ahead of any other
    /// ordering problem.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.raw.windows(2).any(|w| w[0] == w[1]) {
            return Err(CalibrationError::IncompleteCalibration);
        }
        if self.raw.windows(2).any(|w| w[1] < w[0]) {
            return Err(CalibrationError::NonMonotonic);
        }
        // `!(a < b)` also rejects NaN
        if self.nominal.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(CalibrationError::NonMonotonic);
        }
        Ok(())
    }
}
