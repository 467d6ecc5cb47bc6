//! Scripted front panel

use eurocal_hal::{ButtonId, ControlPanel, KnobId, PowerSense};

/// Front panel driven by the test
///
/// Presses queue up until the control loop consumes them.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimPanel {
    presses: [u8; 2],
    knobs: [u8; 2],
}

impl SimPanel {
    /// No pending presses, knobs fully counter-clockwise
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a press of `button`
    pub fn press(&mut self, button: ButtonId) {
        let count = &mut self.presses[button_index(button)];
        *count = count.saturating_add(1);
    }

    /// Turn `knob` to `position`
    pub fn set_knob(&mut self, knob: KnobId, position: u8) {
        self.knobs[knob_index(knob)] = position;
    }

    /// Presses of `button` not yet consumed
    pub fn pending(&self, button: ButtonId) -> u8 {
        self.presses[button_index(button)]
    }
}

fn button_index(button: ButtonId) -> usize {
    match button {
        ButtonId::B1 => 0,
        ButtonId::B2 => 1,
    }
}

fn knob_index(knob: KnobId) -> usize {
    match knob {
        KnobId::K1 => 0,
        KnobId::K2 => 1,
    }
}

impl ControlPanel for SimPanel {
    fn button_pressed(&mut self, button: ButtonId) -> bool {
        let count = &mut self.presses[button_index(button)];
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    fn knob_position(&mut self, knob: KnobId, resolution: u8) -> u8 {
        self.knobs[knob_index(knob)].min(resolution.saturating_sub(1))
    }
}

/// Supply sensing with a fixed answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimPower {
    /// Module reports USB power
    pub usb: bool,
}

impl SimPower {
    /// Powered over USB; the rack may be off
    pub fn usb() -> Self {
        Self { usb: true }
    }

    /// Powered from the rack
    pub fn rack() -> Self {
        Self { usb: false }
    }
}

impl PowerSense for SimPower {
    fn usb_powered(&self) -> bool {
        self.usb
    }
}
