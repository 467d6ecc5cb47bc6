//! Board-agnostic core logic for the eurocal calibration procedures
//!
//! This crate contains everything that does not depend on a specific board:
//!
//! - Declarative state machine engine for guided procedures
//! - Piecewise-linear calibration model and the DAC convergence search
//! - Persisted calibration records
//! - Input and output calibration procedures
//! - Input monitor and voltage generator built on the stored calibrations
//! - Control loop turning panel input into state machine actions

#![no_std]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules.
#[macro_use]
mod fmt;

pub mod calibration;
pub mod config;
pub mod procedure;
pub mod runner;
pub mod state;
