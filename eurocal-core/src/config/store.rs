//! Calibration persistence
//!
//! Loads and saves the calibration records through [`FlashStorage`].
//! Loading never fails: a missing or damaged record falls back to the
//! built-in defaults.

use serde::{de::DeserializeOwned, Serialize};

use eurocal_hal::{FlashError, FlashStorage, StorageKey};

use super::calibration::{InputCalibrationData, OutputCalibrationData};

/// Maximum serialized record size
pub const MAX_RECORD_SIZE: usize = 256;

/// Calibration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Flash operation failed
    Flash(FlashError),
    /// Serialization failed
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// CRC check failed
    CrcMismatch,
    /// Invalid magic or version
    InvalidFormat,
}

impl From<FlashError> for StoreError {
    fn from(e: FlashError) -> Self {
        StoreError::Flash(e)
    }
}

/// A record with a storage slot and an integrity check
trait Record: Serialize + DeserializeOwned + Default {
    const KEY: StorageKey;

    fn is_valid(&self) -> bool;
    fn verify_crc(&self) -> bool;
    fn update_crc(&mut self);
}

impl Record for InputCalibrationData {
    const KEY: StorageKey = StorageKey::InputCalibration;

    fn is_valid(&self) -> bool {
        InputCalibrationData::is_valid(self)
    }

    fn verify_crc(&self) -> bool {
        InputCalibrationData::verify_crc(self)
    }

    fn update_crc(&mut self) {
        InputCalibrationData::update_crc(self)
    }
}

impl Record for OutputCalibrationData {
    const KEY: StorageKey = StorageKey::OutputCalibration;

    fn is_valid(&self) -> bool {
        OutputCalibrationData::is_valid(self)
    }

    fn verify_crc(&self) -> bool {
        OutputCalibrationData::verify_crc(self)
    }

    fn update_crc(&mut self) {
        OutputCalibrationData::update_crc(self)
    }
}

/// Load the analog input calibration, or the defaults
pub fn load_input_calibration<F: FlashStorage>(storage: &mut F) -> InputCalibrationData {
    load_or_default(storage)
}

/// Load the DAC output calibration, or the defaults
pub fn load_output_calibration<F: FlashStorage>(storage: &mut F) -> OutputCalibrationData {
    load_or_default(storage)
}

/// Save the analog input calibration
///
/// Updates the CRC before saving.
pub fn save_input_calibration<F: FlashStorage>(
    storage: &mut F,
    data: &mut InputCalibrationData,
) -> Result<(), StoreError> {
    save_record(storage, data)?;
    info!("Saved input calibration to flash");
    Ok(())
}

/// Save the DAC output calibration
///
/// Updates the CRC before saving.
pub fn save_output_calibration<F: FlashStorage>(
    storage: &mut F,
    data: &mut OutputCalibrationData,
) -> Result<(), StoreError> {
    save_record(storage, data)?;
    info!("Saved output calibration to flash");
    Ok(())
}

fn load_or_default<F: FlashStorage, R: Record>(storage: &mut F) -> R {
    match load_record(storage) {
        Ok(data) => {
            info!("Loaded calibration record {} from flash", R::KEY.as_u8());
            data
        }
        Err(StoreError::Flash(FlashError::NotFound)) => {
            debug!("No calibration record {} in flash, using defaults", R::KEY.as_u8());
            R::default()
        }
        Err(e) => {
            warn!("Failed to load calibration: {:?}, using defaults", e);
            R::default()
        }
    }
}

fn load_record<F: FlashStorage, R: Record>(storage: &mut F) -> Result<R, StoreError> {
    let mut buffer = [0u8; MAX_RECORD_SIZE];
    let len = storage.read(R::KEY, &mut buffer)?;

    debug!("Read {} bytes of calibration from flash", len);

    let data: R = postcard::from_bytes(&buffer[..len]).map_err(|_| StoreError::Deserialize)?;

    if !data.is_valid() {
        return Err(StoreError::InvalidFormat);
    }

    if !data.verify_crc() {
        warn!("Calibration CRC mismatch");
        return Err(StoreError::CrcMismatch);
    }

    Ok(data)
}

fn save_record<F: FlashStorage, R: Record>(storage: &mut F, data: &mut R) -> Result<(), StoreError> {
    data.update_crc();

    let mut buffer = [0u8; MAX_RECORD_SIZE];
    let bytes = postcard::to_slice(data, &mut buffer).map_err(|_| StoreError::Serialize)?;

    debug!("Saving {} bytes of calibration to flash", bytes.len());

    storage.write(R::KEY, bytes)?;
    Ok(())
}
