//! Calibration records
//!
//! The results of both procedures, in the form they are stored in flash.
//! Each record carries a magic number, a format version and a CRC32 over
//! its payload.

use serde::{Deserialize, Serialize};

use eurocal_hal::{DacChannel, DAC_CHANNELS};

use super::types::{INPUT_POINTS, INPUT_TARGETS};
use crate::calibration::{
    CalibrationError, CalibrationTable, DacCalibration, InputCalibration, DAC_POINTS,
};

/// Magic number identifying an input calibration record
pub const INPUT_MAGIC: u32 = 0x4541_494E; // "EAIN"

/// Magic number identifying an output calibration record
pub const OUTPUT_MAGIC: u32 = 0x4544_4143; // "EDAC"

/// Current record format version
pub const CALIBRATION_VERSION: u8 = 1;

/// Readings of an uncalibrated module at 0..11 V
pub const DEFAULT_INPUT_READINGS: [u16; INPUT_POINTS] = [
    384, 6184, 11984, 17784, 23584, 29384, 35184, 40984, 46784, 52584, 58384, 64184,
];

/// Nominal DAC codes per volt of the output stage
const DEFAULT_CODES_PER_VOLT: u16 = 388;

/// Analog input calibration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputCalibrationData {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    /// Nominal voltage of each point, after fine-tuning
    pub points: [f32; INPUT_POINTS],
    /// Raw reading captured at each point
    pub readings: [u16; INPUT_POINTS],
    /// CRC32 checksum (calculated over magic..readings)
    pub crc: u32,
}

impl Default for InputCalibrationData {
    fn default() -> Self {
        Self::new(INPUT_TARGETS, DEFAULT_INPUT_READINGS)
    }
}

impl InputCalibrationData {
    /// Create a record with a valid header and CRC
    pub fn new(points: [f32; INPUT_POINTS], readings: [u16; INPUT_POINTS]) -> Self {
        let mut data = Self {
            magic: INPUT_MAGIC,
            version: CALIBRATION_VERSION,
            points,
            readings,
            crc: 0,
        };
        data.update_crc();
        data
    }

    /// Check if the header matches this firmware
    pub fn is_valid(&self) -> bool {
        self.magic == INPUT_MAGIC && self.version == CALIBRATION_VERSION
    }

    /// Calculate CRC32 for the data (excluding the crc field itself)
    pub fn calculate_crc(&self) -> u32 {
        let mut crc: u32 = 0xFFFF_FFFF;
        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);
        for point in &self.points {
            crc = crc32_update(crc, &point.to_le_bytes());
        }
        for reading in &self.readings {
            crc = crc32_update(crc, &reading.to_le_bytes());
        }
        !crc
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc = self.calculate_crc();
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }

    /// Points and readings as a table
    pub fn table(&self) -> Result<CalibrationTable, CalibrationError> {
        CalibrationTable::new(&self.points, &self.readings)
    }

    /// Build the reading-to-voltage model
    pub fn model(&self) -> Result<InputCalibration, CalibrationError> {
        InputCalibration::build(self.table()?)
    }
}

/// DAC output calibration record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputCalibrationData {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    /// Codes for 0..10 V, indexed by DAC channel
    pub codes: [[u16; DAC_POINTS]; DAC_CHANNELS],
    /// CRC32 checksum (calculated over magic..codes)
    pub crc: u32,
}

impl Default for OutputCalibrationData {
    fn default() -> Self {
        let channel: [u16; DAC_POINTS] =
            core::array::from_fn(|v| v as u16 * DEFAULT_CODES_PER_VOLT);
        Self::new([channel; DAC_CHANNELS])
    }
}

impl OutputCalibrationData {
    /// Create a record with a valid header and CRC
    pub fn new(codes: [[u16; DAC_POINTS]; DAC_CHANNELS]) -> Self {
        let mut data = Self {
            magic: OUTPUT_MAGIC,
            version: CALIBRATION_VERSION,
            codes,
            crc: 0,
        };
        data.update_crc();
        data
    }

    /// Check if the header matches this firmware
    pub fn is_valid(&self) -> bool {
        self.magic == OUTPUT_MAGIC && self.version == CALIBRATION_VERSION
    }

    /// Calculate CRC32 for the data (excluding the crc field itself)
    pub fn calculate_crc(&self) -> u32 {
        let mut crc: u32 = 0xFFFF_FFFF;
        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);
        for channel in &self.codes {
            for code in channel {
                crc = crc32_update(crc, &code.to_le_bytes());
            }
        }
        !crc
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc = self.calculate_crc();
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }

    /// Replace one channel's codes and refresh the CRC
    pub fn set_channel(&mut self, channel: DacChannel, codes: [u16; DAC_POINTS]) {
        self.codes[channel.index()] = codes;
        self.update_crc();
    }

    /// Build the voltage-to-code model for `channel`
    pub fn model(&self, channel: DacChannel) -> Result<DacCalibration, CalibrationError> {
        DacCalibration::new(self.codes[channel.index()])
    }
}

/// CRC32 update (IEEE 802.3 polynomial, reflected)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        // Standard CRC-32 check value for "123456789"
        assert_eq!(!crc32_update(0xFFFF_FFFF, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_default_input_is_usable() {
        let data = InputCalibrationData::default();
        assert!(data.is_valid());
        assert!(data.verify_crc());
        let model = data.model().unwrap();
        assert_eq!(model.forward(384), 0.0);
        assert_eq!(model.inverse(11.0), 64184);
    }

    #[test]
    fn test_input_crc_detects_change() {
        let mut data = InputCalibrationData::default();
        data.readings[3] += 1;
        assert!(!data.verify_crc());
        data.update_crc();
        assert!(data.verify_crc());
    }

    #[test]
    fn test_default_output_is_usable() {
        let data = OutputCalibrationData::default();
        assert!(data.is_valid());
        assert!(data.verify_crc());
        for channel in DacChannel::ALL {
            let model = data.model(channel).unwrap();
            assert_eq!(model.code_for(10.0), 3880);
        }
    }

    #[test]
    fn test_set_channel_keeps_crc_valid() {
        let mut data = OutputCalibrationData::default();
        let codes: [u16; DAC_POINTS] = core::array::from_fn(|v| v as u16 * 400);
        data.set_channel(DacChannel::C, codes);
        assert!(data.verify_crc());
        assert_eq!(data.codes[2][10], 4000);
        assert_eq!(data.codes[0][10], 3880);
    }

    #[test]
    fn test_magic_mismatch_is_invalid() {
        let mut data = OutputCalibrationData::default();
        data.magic = INPUT_MAGIC;
        assert!(!data.is_valid());
    }
}
