//! Front panel controls and power sensing

/// Push buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    /// Left button (back / retry / abort)
    B1,
    /// Right button (confirm / next)
    B2,
}

/// Potentiometer knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KnobId {
    /// Left knob
    K1,
    /// Right knob
    K2,
}

/// Buttons and knobs on the front panel
///
/// Debouncing is the implementation's concern. Button presses are latched
/// as edges by the implementation (typically from an interrupt) and
/// consumed by [`ControlPanel::button_pressed`].
pub trait ControlPanel {
    /// Consume one pending press edge for `button`
    ///
    /// Returns `true` at most once per physical press.
    fn button_pressed(&mut self, button: ButtonId) -> bool;

    /// Read a knob quantized to `resolution` steps
    ///
    /// Returns a position in `0..resolution`.
    fn knob_position(&mut self, knob: KnobId, resolution: u8) -> u8;
}

/// Supply sensing
pub trait PowerSense {
    /// Check if the module is currently powered from USB
    ///
    /// When USB powered the rack supply may be off, which leaves the analog
    /// stages unpowered.
    fn usb_powered(&self) -> bool;
}
