//! Procedure configuration types

use eurocal_hal::{DacChannel, DAC_CHANNELS, DEFAULT_SAMPLES};

/// Number of analog input calibration points
pub const INPUT_POINTS: usize = 12;

/// Nominal voltages of the analog input calibration points
pub const INPUT_TARGETS: [f32; INPUT_POINTS] =
    [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0];

/// Knob resolution used for fine-tuning
pub const KNOB_RESOLUTION: u8 = 10;

/// A front panel output jack and the DAC channel behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputJack {
    /// Jack number as printed on the panel
    pub jack: u8,
    /// DAC channel driving the jack
    pub channel: DacChannel,
}

impl OutputJack {
    /// Create a new jack mapping
    pub const fn new(jack: u8, channel: DacChannel) -> Self {
        Self { jack, channel }
    }
}

/// DAC-driven jacks in calibration order
pub const OUTPUT_JACKS: [OutputJack; DAC_CHANNELS] = [
    OutputJack::new(3, DacChannel::D),
    OutputJack::new(4, DacChannel::B),
    OutputJack::new(5, DacChannel::C),
    OutputJack::new(6, DacChannel::A),
];

/// Analog input calibration settings
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputProcedureConfig {
    /// Nominal voltage of each point before fine-tuning
    pub targets: [f32; INPUT_POINTS],
    /// ADC oversampling per reading
    pub samples: u16,
    /// Time the "saving" screen stays up (ms)
    pub save_hold_ms: u32,
}

impl Default for InputProcedureConfig {
    fn default() -> Self {
        Self {
            targets: INPUT_TARGETS,
            samples: DEFAULT_SAMPLES,
            save_hold_ms: 1000,
        }
    }
}

/// DAC output calibration settings
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputProcedureConfig {
    /// ADC oversampling per reading
    pub samples: u16,
    /// Wait after the channel is first driven to 0 V (ms)
    pub initial_settle_ms: u32,
    /// Wait after each code change before sampling (ms)
    pub settle_ms: u32,
    /// Time each point's result stays on screen (ms)
    pub result_hold_ms: u32,
    /// Stop searching once the reading is this close to the target
    pub tolerance: u16,
    /// Jacks in the order they are calibrated
    pub jacks: [OutputJack; DAC_CHANNELS],
}

impl Default for OutputProcedureConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            initial_settle_ms: 500,
            settle_ms: 100,
            result_hold_ms: 1000,
            tolerance: 0,
            jacks: OUTPUT_JACKS,
        }
    }
}

/// Live input monitor settings
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorConfig {
    /// ADC oversampling per reading
    pub samples: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
        }
    }
}

/// Calibrated voltage generator settings
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeneratorConfig {
    /// ADC oversampling for the input readback
    pub samples: u16,
    /// Knob 1 quantization, one step per volt
    pub volts_resolution: u8,
    /// Knob 2 quantization, one step per hundredth of a volt
    pub hundredths_resolution: u8,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            volts_resolution: 10,
            hundredths_resolution: 100,
        }
    }
}

/// Control loop settings
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoopConfig {
    /// Knob quantization
    pub knob_resolution: u8,
    /// Pause after each periodic display refresh (ms)
    pub refresh_ms: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            knob_resolution: KNOB_RESOLUTION,
            refresh_ms: 200,
        }
    }
}
