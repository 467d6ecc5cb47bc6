//! Delay that advances a counter instead of waiting

use embedded_hal::delay::DelayNs;

/// Counts requested delay time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total delay requested so far, in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}
