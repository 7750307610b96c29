//! Clock frequencies with unit parsing and period arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit suffixes accepted by [`Frequency::from_str`], longest first.
const UNITS: [(&str, f64); 4] = [
    ("ghz", 1_000_000_000.0),
    ("mhz", 1_000_000.0),
    ("khz", 1_000.0),
    ("hz", 1.0),
];

/// A clock frequency stored in Hertz.
///
/// Parsed from strings such as `"100MHz"` or `"48000"` (bare numbers are Hz).
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Creates a frequency from a value in megahertz.
    pub fn from_mhz(mhz: f64) -> Self {
        Self(mhz * 1_000_000.0)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns the frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }

    /// Returns the length of one clock period in nanoseconds.
    ///
    /// A zero frequency has an infinite period.
    pub fn period_ns(&self) -> f64 {
        if self.0 > 0.0 {
            1_000_000_000.0 / self.0
        } else {
            f64::INFINITY
        }
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (suffix, scale) in UNITS {
            if self.0 >= scale {
                let unit = match suffix {
                    "ghz" => "GHz",
                    "mhz" => "MHz",
                    "khz" => "KHz",
                    _ => "Hz",
                };
                return write!(f, "{}{unit}", self.0 / scale);
            }
        }
        write!(f, "{}Hz", self.0)
    }
}

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseFrequencyError {
            input: trimmed.to_string(),
        };
        let lower = trimmed.to_ascii_lowercase();
        let (number, scale) = UNITS
            .iter()
            .find_map(|(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((lower.as_str(), 1.0));
        let value: f64 = number.trim().parse().map_err(|_| err())?;
        if !value.is_finite() || value < 0.0 {
            return Err(err());
        }
        Ok(Frequency(value * scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mhz() {
        let f: Frequency = "100MHz".parse().unwrap();
        assert_eq!(f.hz(), 100_000_000.0);
    }

    #[test]
    fn parse_case_insensitive_and_spaced() {
        let f: Frequency = " 50 mhz ".parse().unwrap();
        assert_eq!(f.mhz(), 50.0);
    }

    #[test]
    fn parse_bare_number_is_hz() {
        let f: Frequency = "25000000".parse().unwrap();
        assert_eq!(f.mhz(), 25.0);
    }

    #[test]
    fn parse_rejects_garbage_and_negative() {
        assert!("fast".parse::<Frequency>().is_err());
        assert!("-5MHz".parse::<Frequency>().is_err());
    }

    #[test]
    fn period() {
        assert_eq!(Frequency::from_mhz(100.0).period_ns(), 10.0);
        assert!(Frequency::new(0.0).period_ns().is_infinite());
    }

    #[test]
    fn display_selects_unit() {
        assert_eq!(Frequency::from_mhz(100.0).to_string(), "100MHz");
        assert_eq!(Frequency::new(1_500_000_000.0).to_string(), "1.5GHz");
        assert_eq!(Frequency::new(500.0).to_string(), "500Hz");
    }
}
