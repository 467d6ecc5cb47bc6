//! Analog input and DAC loopback

use eurocal_hal::{AnalogInput, DacChannel, DacError, DacOutput, DAC_CHANNELS, MAX_DAC_CODE};

/// Reading at 0 V
pub const ADC_OFFSET: f32 = 350.0;

/// Reading increase per volt at the analog input
pub const COUNTS_PER_VOLT: f32 = 5300.0;

/// Output voltage at full DAC scale (3.3 V reference, x3.2 output stage)
pub const DAC_FULL_SCALE: f32 = 10.56;

/// Analog input jack plus the four DAC outputs
///
/// The input sees either a bench source or one patched DAC output. With
/// rack power off the input stage is dead and reads its offset at any
/// voltage.
#[derive(Debug, Clone)]
pub struct SimRig {
    codes: [u16; DAC_CHANNELS],
    gains: [f32; DAC_CHANNELS],
    decreases: [u32; DAC_CHANNELS],
    patched: Option<DacChannel>,
    source_volts: f32,
    rack_power: bool,
    writes: u32,
}

impl Default for SimRig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRig {
    /// Ideal outputs, bench source at 0 V, rack power on
    pub fn new() -> Self {
        Self {
            codes: [0; DAC_CHANNELS],
            gains: [1.0; DAC_CHANNELS],
            decreases: [0; DAC_CHANNELS],
            patched: None,
            source_volts: 0.0,
            rack_power: true,
            writes: 0,
        }
    }

    /// Scale one output's voltage, e.g. 0.98 for a 2% low output stage
    pub fn set_gain(&mut self, channel: DacChannel, gain: f32) {
        self.gains[channel.index()] = gain;
    }

    /// Patch `channel` into the analog input
    pub fn patch(&mut self, channel: DacChannel) {
        self.patched = Some(channel);
    }

    /// Return the analog input to the bench source
    pub fn unpatch(&mut self) {
        self.patched = None;
    }

    /// Output patched into the analog input
    pub fn patched(&self) -> Option<DacChannel> {
        self.patched
    }

    /// Set the bench source voltage
    pub fn set_source_volts(&mut self, volts: f32) {
        self.source_volts = volts;
    }

    /// Switch the rack supply
    pub fn set_rack_power(&mut self, on: bool) {
        self.rack_power = on;
    }

    /// Code last written to `channel`
    pub fn code(&self, channel: DacChannel) -> u16 {
        self.codes[channel.index()]
    }

    /// Voltage `channel` is putting out
    pub fn output_volts(&self, channel: DacChannel) -> f32 {
        let index = channel.index();
        f32::from(self.codes[index]) * DAC_FULL_SCALE / 4096.0 * self.gains[index]
    }

    /// Number of writes to `channel` that lowered its code, zeroing excluded
    pub fn decreases(&self, channel: DacChannel) -> u32 {
        self.decreases[channel.index()]
    }

    /// Total DAC writes
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Reading the powered input produces at `volts`
    pub fn reading_for_volts(volts: f32) -> u16 {
        let reading = (ADC_OFFSET + volts * COUNTS_PER_VOLT).clamp(0.0, 65535.0);
        (reading + 0.5) as u16
    }

    fn input_volts(&self) -> f32 {
        match self.patched {
            Some(channel) => self.output_volts(channel),
            None => self.source_volts,
        }
    }
}

impl AnalogInput for SimRig {
    fn read_raw(&mut self) -> u16 {
        if self.rack_power {
            Self::reading_for_volts(self.input_volts())
        } else {
            Self::reading_for_volts(0.0)
        }
    }
}

impl DacOutput for SimRig {
    fn set_code(&mut self, channel: DacChannel, code: u16) -> Result<(), DacError> {
        if code > MAX_DAC_CODE {
            return Err(DacError::CodeOutOfRange);
        }
        let index = channel.index();
        if code != 0 && code < self.codes[index] {
            self.decreases[index] += 1;
        }
        self.codes[index] = code;
        self.writes += 1;
        Ok(())
    }
}
