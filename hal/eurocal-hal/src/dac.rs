//! Four-channel DAC abstraction

/// Number of DAC channels on the module
pub const DAC_CHANNELS: usize = 4;

/// Highest code accepted by the 12-bit DAC
pub const MAX_DAC_CODE: u16 = 4095;

/// DAC channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacChannel {
    /// Channel A (index 0)
    A,
    /// Channel B (index 1)
    B,
    /// Channel C (index 2)
    C,
    /// Channel D (index 3)
    D,
}

impl DacChannel {
    /// All channels in index order
    pub const ALL: [DacChannel; DAC_CHANNELS] =
        [DacChannel::A, DacChannel::B, DacChannel::C, DacChannel::D];

    /// Get the channel index (0-3)
    pub const fn index(self) -> usize {
        match self {
            DacChannel::A => 0,
            DacChannel::B => 1,
            DacChannel::C => 2,
            DacChannel::D => 3,
        }
    }

    /// Get a channel from its index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Errors from DAC operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacError {
    /// Code above [`MAX_DAC_CODE`]
    CodeOutOfRange,
    /// Bus transfer to the converter failed
    Bus,
}

/// Multi-channel DAC
pub trait DacOutput {
    /// Drive a channel with a raw code
    ///
    /// Implementations must reject codes above [`MAX_DAC_CODE`] with
    /// [`DacError::CodeOutOfRange`] rather than truncating them.
    fn set_code(&mut self, channel: DacChannel, code: u16) -> Result<(), DacError>;

    /// Drive every channel to code 0
    fn zero_all(&mut self) -> Result<(), DacError> {
        for channel in DacChannel::ALL {
            self.set_code(channel, 0)?;
        }
        Ok(())
    }
}
