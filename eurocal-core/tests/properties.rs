//! Property tests for the calibration model and the DAC search

use eurocal_core::calibration::{
    converge, CalibrationError, CalibrationTable, InputCalibration, Probe, SearchConfig,
    SearchError,
};
use eurocal_hal::{DacError, MAX_DAC_CODE};
use proptest::prelude::*;

/// Strictly increasing raw codes for unit-spaced nominals 0, 1, 2, ...
fn raw_codes() -> impl Strategy<Value = Vec<u16>> {
    (0u16..2000, prop::collection::vec(1u16..5000, 1..12)).prop_map(|(start, steps)| {
        let mut raw = vec![start];
        for step in steps {
            let last = *raw.last().unwrap();
            raw.push(last + step);
        }
        raw
    })
}

fn model(raw: &[u16]) -> InputCalibration {
    let nominal: Vec<f32> = (0..raw.len()).map(|i| i as f32).collect();
    let table = CalibrationTable::new(&nominal, raw).unwrap();
    InputCalibration::build(table).unwrap()
}

/// Reading = offset + code * gain / 100, rising with the code
struct Linear {
    offset: u32,
    gain_x100: u32,
    code: u16,
    applied: Vec<u16>,
}

impl Probe for Linear {
    fn apply(&mut self, code: u16) -> Result<(), DacError> {
        self.code = code;
        self.applied.push(code);
        Ok(())
    }

    fn sample(&mut self) -> u16 {
        (self.offset + u32::from(self.code) * self.gain_x100 / 100).min(65535) as u16
    }
}

proptest! {
    #[test]
    fn test_forward_is_monotonic(raw in raw_codes(), a in any::<u16>(), b in any::<u16>()) {
        let model = model(&raw);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(model.forward(low) <= model.forward(high));
    }

    #[test]
    fn test_forward_stays_in_range(raw in raw_codes(), reading in any::<u16>()) {
        let model = model(&raw);
        let volts = model.forward(reading);
        prop_assert!((0.0..=12.0).contains(&volts));
        if reading < raw[0] {
            prop_assert_eq!(volts, 0.0);
        }
    }

    #[test]
    fn test_inverse_undoes_forward(raw in raw_codes(), pick in any::<u16>()) {
        let model = model(&raw);
        let first = raw[0];
        let last = *raw.last().unwrap();
        let reading = first + pick % (last - first + 1);
        let back = model.inverse(model.forward(reading));
        prop_assert!(
            (i32::from(back) - i32::from(reading)).abs() <= 1,
            "reading {} came back as {}", reading, back
        );
    }

    #[test]
    fn test_duplicate_code_is_incomplete(raw in raw_codes(), at in any::<prop::sample::Index>()) {
        let mut raw = raw;
        let k = at.index(raw.len() - 1);
        raw[k + 1] = raw[k];
        let nominal: Vec<f32> = (0..raw.len()).map(|i| i as f32).collect();
        let table = CalibrationTable::new(&nominal, &raw).unwrap();
        prop_assert_eq!(
            InputCalibration::build(table).unwrap_err(),
            CalibrationError::IncompleteCalibration
        );
    }

    #[test]
    fn test_search_terminates_without_lowering_the_code(
        offset in 0u32..5000,
        gain_x100 in 1u32..3000,
        expected in any::<u16>(),
        tolerance in 0u16..50,
    ) {
        let mut probe = Linear { offset, gain_x100, code: 0, applied: Vec::new() };
        let start = probe.sample();
        let config = SearchConfig { tolerance, ..SearchConfig::default() };

        let result = converge(&mut probe, &config, 0, start, expected);

        prop_assert!(probe.applied.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(probe.applied.len() <= usize::from(MAX_DAC_CODE));
        match result {
            Ok(found) => {
                prop_assert!(found.reading >= expected || expected - found.reading <= tolerance);
                prop_assert_eq!(usize::from(found.steps), probe.applied.len());
            }
            Err(SearchError::Saturated { code }) => {
                prop_assert_eq!(code, MAX_DAC_CODE);
                prop_assert!(probe.sample() < expected);
            }
            Err(e) => prop_assert!(false, "unexpected error {:?}", e),
        }
    }
}
