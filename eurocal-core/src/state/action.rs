//! Actions that drive procedure state machines

use eurocal_hal::{ButtonId, KnobId};

/// Operator and housekeeping actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Button 1 pressed
    Button1,
    /// Button 2 pressed
    Button2,
    /// Knob 1 moved to a new position
    Knob1,
    /// Knob 2 moved to a new position
    Knob2,
    /// Periodic redraw of a live screen
    RefreshDisplay,
    /// Re-initialize hardware and restart the procedure
    Reset,
}

impl Action {
    /// Action for a button edge
    pub fn from_button(button: ButtonId) -> Self {
        match button {
            ButtonId::B1 => Action::Button1,
            ButtonId::B2 => Action::Button2,
        }
    }

    /// Action for a knob change
    pub fn from_knob(knob: KnobId) -> Self {
        match knob {
            KnobId::K1 => Action::Knob1,
            KnobId::K2 => Action::Knob2,
        }
    }
}
