//! Analog input model
//!
//! Maps raw ADC readings to volts with one linear segment per pair of
//! adjacent calibration points. Readings below the first point clamp to
//! 0 V; readings above the last point extrapolate along the last segment.
//! The result is always clamped to the representable voltage range.

use heapless::Vec;

use super::table::{CalibrationError, CalibrationTable, MAX_POINTS, MAX_VOLTAGE, MIN_VOLTAGE};

/// Reading-to-voltage model built from a validated table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputCalibration {
    table: CalibrationTable,
    /// Volts per raw code for each segment; the last entry repeats the one
    /// before it to cover extrapolation
    gradients: Vec<f32, MAX_POINTS>,
}

impl InputCalibration {
    /// Validate `table` and compute its gradients
    ///
    /// Calibration points are one volt apart, so each gradient is
    /// `1 / (raw[i+1] - raw[i])`.
    pub fn build(table: CalibrationTable) -> Result<Self, CalibrationError> {
        table.validate()?;

        let mut gradients = Vec::new();
        for w in table.raw().windows(2) {
            let span = f32::from(w[1] - w[0]);
            let _ = gradients.push(1.0 / span);
        }
        let last = gradients[gradients.len() - 1];
        let _ = gradients.push(last);

        Ok(Self { table, gradients })
    }

    /// Calibration points backing the model
    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// Per-segment gradients
    pub fn gradients(&self) -> &[f32] {
        &self.gradients
    }

    /// Convert a raw reading to volts
    pub fn forward(&self, reading: u16) -> f32 {
        let raw = self.table.raw();
        let Some(i) = raw.iter().rposition(|&r| r <= reading) else {
            return MIN_VOLTAGE;
        };
        let volts =
            self.table.nominal()[i] + self.gradients[i] * f32::from(reading - raw[i]);
        volts.clamp(MIN_VOLTAGE, MAX_VOLTAGE)
    }

    /// Predict the raw reading for `volts`
    ///
    /// Below the first point this is the first raw code. The fractional
    /// part is truncated and the result saturates at the code range.
    pub fn inverse(&self, volts: f32) -> u16 {
        let nominal = self.table.nominal();
        let raw = self.table.raw();
        let Some(i) = nominal.iter().rposition(|&n| n <= volts) else {
            return raw[0];
        };
        let code = f32::from(raw[i]) + (volts - nominal[i]) / self.gradients[i];
        code as u16
    }
}
