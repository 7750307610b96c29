//! Latency to clock-cycle conversion.

use foundry_common::Frequency;
use foundry_device::{OperatorKind, TimingKey, TimingReport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduling failures. Both abort the transformation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimingError {
    /// The timing report has no entry for an operation that needs one.
    #[error("no timing data for {key}")]
    MissingTiming {
        /// The unresolved operation.
        key: TimingKey,
    },
    /// The timing report gives a negative or non-finite latency.
    #[error("invalid latency {latency_ns} ns for {key}")]
    InvalidLatency {
        /// The operation.
        key: TimingKey,
        /// The offending latency.
        latency_ns: f64,
    },
}

/// The clock usage of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockCycles {
    /// Latency as a fraction of clock periods (`latency * frequency`).
    pub fraction: f64,
    /// Whole clock cycles needed: the ceiling of `fraction`.
    pub cycles: u32,
}

impl ClockCycles {
    /// No clock usage.
    pub const ZERO: ClockCycles = ClockCycles {
        fraction: 0.0,
        cycles: 0,
    };

    /// Returns `true` if the result is not available in the issuing cycle.
    pub fn is_multi_cycle(&self) -> bool {
        self.cycles > 1
    }
}

/// Converts a latency to clock cycles: `ceil(latency_ns * clock_hz * 1e-9)`.
///
/// Negative and non-finite latencies are rejected; `key` names the operation
/// in the error.
pub fn latency_to_cycles(
    latency_ns: f64,
    clock: Frequency,
    key: TimingKey,
) -> Result<ClockCycles, TimingError> {
    if !latency_ns.is_finite() || latency_ns < 0.0 {
        return Err(TimingError::InvalidLatency { key, latency_ns });
    }
    let fraction = latency_ns * clock.hz() / 1e9;
    Ok(ClockCycles {
        fraction,
        cycles: fraction.ceil() as u32,
    })
}

/// Looks up operations in a timing report and converts them to cycles for
/// one clock frequency.
#[derive(Debug, Clone, Copy)]
pub struct OperationTimer<'a> {
    report: &'a TimingReport,
    clock: Frequency,
}

impl<'a> OperationTimer<'a> {
    /// Creates a timer over a report at a clock frequency.
    pub fn new(report: &'a TimingReport, clock: Frequency) -> Self {
        Self { report, clock }
    }

    /// The clock frequency.
    pub fn clock(&self) -> Frequency {
        self.clock
    }

    /// Clock usage of an operation on operands of `width` bits.
    ///
    /// `constant` is the right operand's value when it is a compile-time
    /// constant; a cheaper constant-specialized entry is then preferred.
    pub fn cost(
        &self,
        operator: OperatorKind,
        width: u16,
        signed: bool,
        constant: Option<i128>,
    ) -> Result<ClockCycles, TimingError> {
        let key = TimingKey {
            operator,
            width,
            signed,
            constant: None,
        };
        let latency = self
            .report
            .latency(operator, width, signed, constant)
            .ok_or(TimingError::MissingTiming { key })?;
        latency_to_cycles(latency, self.clock, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> TimingKey {
        TimingKey {
            operator: OperatorKind::Add,
            width: 32,
            signed: false,
            constant: None,
        }
    }

    #[test]
    fn five_ns_at_100_mhz_is_one_cycle() {
        let c = latency_to_cycles(5.0, Frequency::from_mhz(100.0), key()).unwrap();
        assert_eq!(c.cycles, 1);
        assert!((c.fraction - 0.5).abs() < 1e-12);
        assert!(!c.is_multi_cycle());
    }

    #[test]
    fn exact_period_is_one_cycle() {
        let c = latency_to_cycles(10.0, Frequency::from_mhz(100.0), key()).unwrap();
        assert_eq!(c.cycles, 1);
    }

    #[test]
    fn long_latency_spans_cycles() {
        let c = latency_to_cycles(25.0, Frequency::from_mhz(100.0), key()).unwrap();
        assert_eq!(c.cycles, 3);
        assert!(c.is_multi_cycle());
    }

    #[test]
    fn zero_latency_is_free() {
        let c = latency_to_cycles(0.0, Frequency::from_mhz(100.0), key()).unwrap();
        assert_eq!(c, ClockCycles::ZERO);
    }

    #[test]
    fn negative_latency_is_an_error() {
        let err = latency_to_cycles(-0.5, Frequency::from_mhz(100.0), key()).unwrap_err();
        assert!(matches!(err, TimingError::InvalidLatency { .. }));
        assert!(latency_to_cycles(f64::NAN, Frequency::from_mhz(100.0), key()).is_err());
    }

    #[test]
    fn cycles_never_decrease_with_latency() {
        let clock = Frequency::from_mhz(150.0);
        let mut previous = 0;
        for step in 0..400 {
            let latency = f64::from(step) * 0.25;
            let c = latency_to_cycles(latency, clock, key()).unwrap();
            assert!(c.cycles >= previous, "latency {latency} ns");
            previous = c.cycles;
        }
    }

    #[test]
    fn timer_reports_missing_entries() {
        let report = TimingReport::new();
        let timer = OperationTimer::new(&report, Frequency::from_mhz(100.0));
        let err = timer.cost(OperatorKind::Mul, 64, true, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no timing data for mul on 64-bit signed operands"
        );
    }

    #[test]
    fn timer_prefers_constant_entry() {
        let mut report = TimingReport::new();
        report.insert(
            TimingKey {
                operator: OperatorKind::Mul,
                width: 32,
                signed: false,
                constant: None,
            },
            15.0,
        );
        report.insert(
            TimingKey {
                operator: OperatorKind::Mul,
                width: 32,
                signed: false,
                constant: Some(8),
            },
            1.0,
        );
        let timer = OperationTimer::new(&report, Frequency::from_mhz(100.0));
        assert_eq!(timer.cost(OperatorKind::Mul, 32, false, None).unwrap().cycles, 2);
        assert_eq!(timer.cost(OperatorKind::Mul, 32, false, Some(8)).unwrap().cycles, 1);
    }
}
