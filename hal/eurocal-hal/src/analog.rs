//! Analog input abstraction

/// Oversampling count used when a caller has no better figure
pub const DEFAULT_SAMPLES: u16 = 32;

/// Analog input channel (the module's "analogue in" jack)
///
/// Readings are full-scale 16-bit values regardless of the converter's
/// native resolution.
pub trait AnalogInput {
    /// Take a single raw conversion
    fn read_raw(&mut self) -> u16;

    /// Oversample the input and return the rounded mean
    ///
    /// A sample count of zero is treated as one.
    fn read_average(&mut self, samples: u16) -> u16 {
        let samples = u32::from(samples.max(1));
        let mut sum: u32 = 0;
        for _ in 0..samples {
            sum += u32::from(self.read_raw());
        }
        ((sum + samples / 2) / samples) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp {
        next: u16,
    }

    impl AnalogInput for Ramp {
        fn read_raw(&mut self) -> u16 {
            let v = self.next;
            self.next += 1;
            v
        }
    }

    #[test]
    fn test_average_rounds_mean() {
        // 10, 11, 12, 13 -> 11.5 -> 12
        let mut adc = Ramp { next: 10 };
        assert_eq!(adc.read_average(4), 12);
    }

    #[test]
    fn test_zero_samples_reads_once() {
        let mut adc = Ramp { next: 42 };
        assert_eq!(adc.read_average(0), 42);
        assert_eq!(adc.next, 43);
    }

    #[test]
    fn test_average_does_not_overflow_at_full_scale() {
        struct Full;
        impl AnalogInput for Full {
            fn read_raw(&mut self) -> u16 {
                u16::MAX
            }
        }
        assert_eq!(Full.read_average(DEFAULT_SAMPLES), u16::MAX);
    }
}
