//! Operator fine-tuning of a calibration point's nominal value
//!
//! Lets an operator with a precise voltmeter but an imprecise source enter
//! the voltage actually applied. Knob 1 selects the tenths (-5..=+4) and
//! knob 2 the hundredths digit (0..=9), for an offset of -0.50 V to
//! +0.49 V around the target.

/// Knob position that maps to a zero tenths offset
const TENTHS_CENTRE: u8 = 5;

/// Offset applied to a nominal calibration voltage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FineTune {
    tenths: i8,
    hundredths: u8,
}

impl FineTune {
    /// No offset
    pub const ZERO: Self = Self {
        tenths: 0,
        hundredths: 0,
    };

    /// Set the tenths from a knob read at resolution 10
    pub fn set_tenths_from_knob(&mut self, position: u8) {
        self.tenths = position.min(9) as i8 - TENTHS_CENTRE as i8;
    }

    /// Set the hundredths digit
    pub fn set_hundredths(&mut self, digit: u8) {
        self.hundredths = digit.min(9);
    }

    /// Offset in hundredths of a volt
    pub fn offset_centivolts(&self) -> i16 {
        i16::from(self.tenths) * 10 + i16::from(self.hundredths)
    }

    /// Apply the offset to a target voltage
    pub fn apply(&self, target: f32) -> f32 {
        target + f32::from(self.offset_centivolts()) / 100.0
    }
}
