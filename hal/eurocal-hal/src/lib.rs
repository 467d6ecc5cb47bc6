//! eurocal Hardware Abstraction Layer
//!
//! Capability traits consumed by the calibration procedures. Board support
//! crates implement them on top of the real ADC, DAC, panel controls and
//! flash; `eurocal-sim` implements them for host-side tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Procedures (eurocal-core)              │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  eurocal-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ board support │       │  eurocal-sim  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`analog::AnalogInput`] - Raw and oversampled ADC reads
//! - [`dac::DacOutput`] - Four-channel 12-bit DAC
//! - [`panel::ControlPanel`], [`panel::PowerSense`] - Buttons, knobs, USB sense
//! - [`flash::FlashStorage`] - Persistent storage
//!
//! Blocking delays use [`embedded_hal::delay::DelayNs`], re-exported here.

#![no_std]
#![deny(unsafe_code)]

pub mod analog;
pub mod dac;
pub mod flash;
pub mod panel;

// Re-export key traits at crate root for convenience
pub use analog::{AnalogInput, DEFAULT_SAMPLES};
pub use dac::{DacChannel, DacError, DacOutput, DAC_CHANNELS, MAX_DAC_CODE};
pub use embedded_hal::delay::DelayNs;
pub use flash::{FlashError, FlashStorage, StorageKey};
pub use panel::{ButtonId, ControlPanel, KnobId, PowerSense};
