//! Simulated hardware for eurocal
//!
//! Stand-ins for the board peripherals so the procedures can run on the
//! host:
//!
//! - [`SimRig`] - analog input with a DAC output that can be patched into it
//! - [`SimPanel`] / [`SimPower`] - scripted front panel and supply sensing
//! - [`SimDelay`] - delay that only counts
//! - [`MemoryStorage`] - RAM-backed flash storage

#![no_std]
#![deny(unsafe_code)]

pub mod delay;
pub mod panel;
pub mod rig;
pub mod storage;

pub use delay::SimDelay;
pub use panel::{SimPanel, SimPower};
pub use rig::{SimRig, ADC_OFFSET, COUNTS_PER_VOLT, DAC_FULL_SCALE};
pub use storage::{MemoryStorage, MAX_VALUE_SIZE};
