//! DAC output model
//!
//! Each channel is calibrated at the integer voltages 0..10 V. Between
//! points the code is interpolated linearly; above 10 V the last segment
//! is extended.

use eurocal_hal::MAX_DAC_CODE;

use super::table::{CalibrationError, MAX_VOLTAGE, MIN_VOLTAGE};

/// Number of calibration points per DAC channel (0 V to 10 V)
pub const DAC_POINTS: usize = 11;

/// Voltage-to-code model for one DAC channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacCalibration {
    codes: [u16; DAC_POINTS],
    /// Codes per volt for each segment; the last entry repeats the one
    /// before it
    gradients: [i32; DAC_POINTS],
}

impl DacCalibration {
    /// Build a model from codes for 0 V, 1 V, ... 10 V
    ///
    /// Codes must not decrease. Equal neighbours are accepted; that segment
    /// simply has a zero gradient.
    pub fn new(codes: [u16; DAC_POINTS]) -> Result<Self, CalibrationError> {
        let mut gradients = [0i32; DAC_POINTS];
        for i in 0..DAC_POINTS - 1 {
            let step = i32::from(codes[i + 1]) - i32::from(codes[i]);
            if step < 0 {
                return Err(CalibrationError::NonMonotonic);
            }
            gradients[i] = step;
        }
        gradients[DAC_POINTS - 1] = gradients[DAC_POINTS - 2];
        Ok(Self { codes, gradients })
    }

    /// Codes at the calibration points
    pub fn codes(&self) -> &[u16; DAC_POINTS] {
        &self.codes
    }

    /// Per-segment gradients in codes per volt
    pub fn gradients(&self) -> &[i32; DAC_POINTS] {
        &self.gradients
    }

    /// DAC code producing `volts`, rounded and capped at the DAC range
    pub fn code_for(&self, volts: f32) -> u16 {
        // `max` first so NaN becomes 0 V
        let volts = volts.max(MIN_VOLTAGE).min(MAX_VOLTAGE);
        let index = (volts as usize).min(DAC_POINTS - 1);
        let fraction = volts - index as f32;
        let code = f32::from(self.codes[index]) + self.gradients[index] as f32 * fraction;
        let rounded = (code + 0.5) as u32;
        rounded.min(u32::from(MAX_DAC_CODE)) as u16
    }
}
