//! Conversion between output voltages and DAC codes.
//!
//! A channel's 16-bit code spans its configured voltage range linearly, code `0` being the
//! minimum voltage and code `65535` the maximum.

use crate::error::RangeError;

/// Largest DAC code.
pub const MAX_CODE: u16 = u16::MAX;

/// Divisor used when converting in either direction between volts and codes.
///
/// The ramp slope uses a different scale, see [`SLOPE_SCALE`](crate::ramp::SLOPE_SCALE).
pub const CODE_SCALE: f64 = 65535.0;

/// The output voltage range of a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageRange {
    min_val: f64,
    max_val: f64,
}

impl Default for VoltageRange {
    /// The DecaDAC's usual ±5V range.
    fn default() -> Self {
        Self {
            min_val: -5.0,
            max_val: 5.0,
        }
    }
}

impl VoltageRange {
    /// Returns `None` unless `min_val < max_val`.
    pub fn new(min_val: f64, max_val: f64) -> Option<Self> {
        (min_val < max_val).then_some(Self { min_val, max_val })
    }

    pub const fn min_val(&self) -> f64 {
        self.min_val
    }

    pub const fn max_val(&self) -> f64 {
        self.max_val
    }

    /// Whether `volt` can be output by the channel.
    pub fn contains(&self, volt: f64) -> bool {
        (self.min_val..=self.max_val).contains(&volt)
    }

    /// Voltage difference between two adjacent codes.
    pub fn step(&self) -> f64 {
        (self.max_val - self.min_val) / CODE_SCALE
    }

    /// Convert a voltage to the DAC code. Midrange is 32768.
    pub fn volt_to_code(&self, volt: f64) -> Result<u16, RangeError> {
        let out_of_range = RangeError {
            volt,
            min: self.min_val,
            max: self.max_val,
        };
        if !self.contains(volt) {
            return Err(out_of_range);
        }

        let frac = (volt - self.min_val) / (self.max_val - self.min_val);
        let code = (frac * CODE_SCALE).round();
        // Never hand the device an out of bounds code.
        if !(0.0..=CODE_SCALE).contains(&code) {
            return Err(out_of_range);
        }
        Ok(code as u16)
    }

    /// Convert a DAC code to a voltage.
    ///
    /// Words read back from the device are 32 bits wide, so this accepts codes past
    /// [`MAX_CODE`] and extrapolates.
    pub fn code_to_volt(&self, code: u32) -> f64 {
        let frac = f64::from(code) / CODE_SCALE;
        frac * (self.max_val - self.min_val) + self.min_val
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_requires_min_below_max() {
        assert!(VoltageRange::new(-5.0, 5.0).is_some());
        assert!(VoltageRange::new(5.0, 5.0).is_none());
        assert!(VoltageRange::new(5.0, -5.0).is_none());
    }

    #[test]
    fn endpoints_and_midrange() {
        let range = VoltageRange::default();
        assert_eq!(range.volt_to_code(-5.0).unwrap(), 0);
        assert_eq!(range.volt_to_code(5.0).unwrap(), MAX_CODE);
        assert_eq!(range.volt_to_code(0.0).unwrap(), 32768);
        assert_eq!(range.volt_to_code(1.0).unwrap(), 39321);
        assert_eq!(range.code_to_volt(0), -5.0);
        assert_eq!(range.code_to_volt(65535), 5.0);
    }

    #[test]
    fn round_trip_within_one_step() {
        for range in [
            VoltageRange::default(),
            VoltageRange::new(0.0, 10.0).unwrap(),
            VoltageRange::new(-10.0, 2.5).unwrap(),
        ] {
            let samples = 1000;
            for i in 0..=samples {
                let volt = range.min_val()
                    + (range.max_val() - range.min_val()) * (i as f64 / samples as f64);
                let code = range.volt_to_code(volt).unwrap();
                let back = range.code_to_volt(code as u32);
                assert!(
                    (back - volt).abs() <= range.step(),
                    "{volt} V -> {code} -> {back} V"
                );
            }
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        let range = VoltageRange::default();
        for volt in [-5.000_001, 5.000_001, -100.0, 100.0, f64::NAN, f64::INFINITY] {
            let err = range.volt_to_code(volt).unwrap_err();
            assert_eq!(err.min, -5.0);
            assert_eq!(err.max, 5.0);
        }
    }
}
