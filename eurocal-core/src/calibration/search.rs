//! DAC code convergence search
//!
//! Raises a DAC code until the analog input reads the expected value for a
//! target voltage. Steps shrink as the reading approaches the target:
//!
//! | reading / expected | step |
//! |--------------------|------|
//! | < 0.50             | 100  |
//! | < 0.80             | 50   |
//! | < 0.95             | 10   |
//! | otherwise          | 1    |
//!
//! The code never decreases, so the loop ends after at most
//! `MAX_DAC_CODE` iterations.

use eurocal_hal::{DacError, MAX_DAC_CODE};

/// Search errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SearchError {
    /// The code reached its maximum before the reading reached the target
    Saturated {
        /// Code at which the search gave up
        code: u16,
    },
    /// Writing the DAC failed
    Dac(DacError),
}

impl From<DacError> for SearchError {
    fn from(e: DacError) -> Self {
        SearchError::Dac(e)
    }
}

/// Search tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SearchConfig {
    /// Readings closer than this to the target stop the search
    pub tolerance: u16,
    /// Highest code the search may apply
    pub max_code: u16,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tolerance: 0,
            max_code: MAX_DAC_CODE,
        }
    }
}

/// One iteration of the search, reported to [`Probe::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SearchProgress {
    /// Code just applied
    pub code: u16,
    /// Reading after settling
    pub reading: u16,
    /// Reading the search is aiming for
    pub expected: u16,
}

impl SearchProgress {
    /// Reading as a fraction of the expected reading, in tenths of a percent
    pub fn permille(&self) -> u32 {
        if self.expected == 0 {
            return 1000;
        }
        u32::from(self.reading) * 1000 / u32::from(self.expected)
    }
}

/// Result of a converged search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Converged {
    /// Code that produced the target
    pub code: u16,
    /// Final reading
    pub reading: u16,
    /// Number of codes applied
    pub steps: u16,
}

/// Closed loop the search drives: a DAC channel patched into the input
pub trait Probe {
    /// Apply `code` and wait for the output to settle
    fn apply(&mut self, code: u16) -> Result<(), DacError>;

    /// Take an oversampled reading
    fn sample(&mut self) -> u16;

    /// Called after every applied step
    fn observe(&mut self, _progress: &SearchProgress) {}
}

/// Code increment for the current reading
pub fn step_for(reading: u16, expected: u16) -> u16 {
    let reading = u32::from(reading) * 100;
    let expected = u32::from(expected);
    if reading < expected * 50 {
        100
    } else if reading < expected * 80 {
        50
    } else if reading < expected * 95 {
        10
    } else {
        1
    }
}

/// Raise the code from `start_code` until the reading reaches `expected`
///
/// `start_reading` is the reading at `start_code`. The final step is capped
/// at `config.max_code`; if that is still short of the target the search
/// fails with [`SearchError::Saturated`].
pub fn converge<P: Probe>(
    probe: &mut P,
    config: &SearchConfig,
    start_code: u16,
    start_reading: u16,
    expected: u16,
) -> Result<Converged, SearchError> {
    let mut code = start_code;
    let mut reading = start_reading;
    let mut steps: u16 = 0;

    while reading < expected && expected - reading > config.tolerance {
        if code >= config.max_code {
            return Err(SearchError::Saturated { code });
        }
        code = code
            .saturating_add(step_for(reading, expected))
            .min(config.max_code);
        probe.apply(code)?;
        reading = probe.sample();
        steps += 1;
        probe.observe(&SearchProgress {
            code,
            reading,
            expected,
        });
    }

    Ok(Converged {
        code,
        reading,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reading = offset + code * gain
    struct Linear {
        offset: u32,
        gain_x100: u32,
        code: u16,
        applied: heapless::Vec<u16, 512>,
        observed: u16,
    }

    impl Linear {
        fn new(offset: u32, gain_x100: u32) -> Self {
            Self {
                offset,
                gain_x100,
                code: 0,
                applied: heapless::Vec::new(),
                observed: 0,
            }
        }
    }

    impl Probe for Linear {
        fn apply(&mut self, code: u16) -> Result<(), DacError> {
            self.code = code;
            let _ = self.applied.push(code);
            Ok(())
        }

        fn sample(&mut self) -> u16 {
            (self.offset + u32::from(self.code) * self.gain_x100 / 100).min(65535) as u16
        }

        fn observe(&mut self, _progress: &SearchProgress) {
            self.observed += 1;
        }
    }

    #[test]
    fn test_step_thresholds() {
        assert_eq!(step_for(0, 1000), 100);
        assert_eq!(step_for(499, 1000), 100);
        assert_eq!(step_for(500, 1000), 50);
        assert_eq!(step_for(799, 1000), 50);
        assert_eq!(step_for(800, 1000), 10);
        assert_eq!(step_for(949, 1000), 10);
        assert_eq!(step_for(950, 1000), 1);
        assert_eq!(step_for(1200, 1000), 1);
    }

    #[test]
    fn test_converges_to_first_code_at_or_above_target() {
        // 15 counts per code
        let mut probe = Linear::new(400, 1500);
        let result = converge(&mut probe, &SearchConfig::default(), 0, 400, 15400).unwrap();

        // 400 + 1000 * 15 = 15400
        assert_eq!(result.code, 1000);
        assert_eq!(result.reading, 15400);
        assert_eq!(result.steps as usize, probe.applied.len());
        assert_eq!(probe.observed, result.steps);
    }

    #[test]
    fn test_codes_never_decrease() {
        let mut probe = Linear::new(400, 1500);
        converge(&mut probe, &SearchConfig::default(), 0, 400, 30000).unwrap();
        assert!(probe.applied.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_coarse_then_fine() {
        let mut probe = Linear::new(0, 1000);
        converge(&mut probe, &SearchConfig::default(), 0, 0, 10000).unwrap();
        let applied = probe.applied.as_slice();
        assert_eq!(&applied[..3], &[100, 200, 300]);
        let last = applied.windows(2).last().unwrap();
        assert_eq!(last[1] - last[0], 1);
    }

    #[test]
    fn test_already_at_target_applies_nothing() {
        let mut probe = Linear::new(400, 1500);
        let result = converge(&mut probe, &SearchConfig::default(), 700, 20000, 15400).unwrap();
        assert_eq!(result.code, 700);
        assert_eq!(result.steps, 0);
        assert!(probe.applied.is_empty());
    }

    #[test]
    fn test_tolerance_stops_early() {
        let mut probe = Linear::new(0, 100);
        let config = SearchConfig {
            tolerance: 5,
            ..Default::default()
        };
        let result = converge(&mut probe, &config, 0, 0, 1000).unwrap();
        assert!(result.reading >= 995);
        assert!(result.code < 1000);
    }

    #[test]
    fn test_saturates_when_target_unreachable() {
        // Full scale only reaches 4095 * 2 = 8190
        let mut probe = Linear::new(0, 200);
        let result = converge(&mut probe, &SearchConfig::default(), 0, 0, 60000);
        assert_eq!(result, Err(SearchError::Saturated { code: MAX_DAC_CODE }));
        assert_eq!(probe.applied.last(), Some(&MAX_DAC_CODE));
    }

    #[test]
    fn test_dac_error_propagates() {
        struct Broken;
        impl Probe for Broken {
            fn apply(&mut self, _code: u16) -> Result<(), DacError> {
                Err(DacError::Bus)
            }
            fn sample(&mut self) -> u16 {
                0
            }
        }
        let result = converge(&mut Broken, &SearchConfig::default(), 0, 0, 100);
        assert_eq!(result, Err(SearchError::Dac(DacError::Bus)));
    }

    #[test]
    fn test_progress_permille() {
        let progress = SearchProgress {
            code: 10,
            reading: 475,
            expected: 500,
        };
        assert_eq!(progress.permille(), 950);
    }
}
