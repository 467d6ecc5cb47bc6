//! Display abstraction and shared components for eurocal
//!
//! This crate provides:
//! - `DisplayBackend` trait for character-addressed text displays
//! - `DisplayExt::show_lines` for the centred three-line layout every
//!   calibration screen uses
//! - `Screen`, an in-memory backend used for buffering and host tests
//!
//! The module's 128x32 OLED fits three rows of sixteen 8-pixel glyphs.

#![no_std]

pub mod backend;
pub mod screen;

// Re-export key types
pub use backend::{DisplayBackend, DisplayError, DisplayExt};
pub use screen::{Screen, SCREEN_COLS, SCREEN_ROWS};
