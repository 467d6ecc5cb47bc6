//! RAM-backed flash storage

use heapless::{LinearMap, Vec};

use eurocal_hal::{FlashError, FlashStorage, StorageKey};

/// Largest value a slot holds
pub const MAX_VALUE_SIZE: usize = 256;

/// Flash storage kept in memory
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: LinearMap<StorageKey, Vec<u8, MAX_VALUE_SIZE>, 4>,
    fail_writes: bool,
    writes: u32,
}

impl MemoryStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with [`FlashError::Flash`]
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Successful writes so far
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl FlashStorage for MemoryStorage {
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let value = self.slots.get(&key).ok_or(FlashError::NotFound)?;
        let target = buffer
            .get_mut(..value.len())
            .ok_or(FlashError::BufferTooSmall)?;
        target.copy_from_slice(value);
        Ok(value.len())
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        if self.fail_writes {
            return Err(FlashError::Flash);
        }
        let value = Vec::from_slice(data).map_err(|_| FlashError::Full)?;
        self.slots.insert(key, value).map_err(|_| FlashError::Full)?;
        self.writes += 1;
        Ok(())
    }

    fn exists(&mut self, key: StorageKey) -> bool {
        self.slots.contains_key(&key)
    }

    fn erase_all(&mut self) -> Result<(), FlashError> {
        self.slots.clear();
        Ok(())
    }
}
