//! Built-in devices.
//!
//! The built-in timing tables are derived from a per-family delay model
//! (`base + per_bit * width` for every operator) calibrated against probe
//! designs, rather than shipped as measured reports.

use crate::driver::StaticDeviceDriver;
use crate::error::DeviceError;
use crate::manifest::{Channel, DeviceManifest};
use crate::timing::{OperatorKind, TimingKey, TimingReport};
use foundry_common::Frequency;

/// Operand widths covered by the built-in tables.
const WIDTHS: [u16; 4] = [8, 16, 32, 64];

/// Constant right operands with specialized entries: multiplication and
/// division by powers of two reduce to shifts.
const POWER_OF_TWO_CONSTANTS: [i128; 4] = [2, 4, 8, 16];

struct DelayModel {
    /// Scales every delay; faster fabrics have smaller factors.
    fabric: f64,
}

impl DelayModel {
    fn latency(&self, operator: OperatorKind, width: u16, signed: bool) -> f64 {
        let w = f64::from(width);
        let (base, per_bit) = match operator {
            OperatorKind::Add | OperatorKind::Sub | OperatorKind::Neg => (0.9, 0.045),
            OperatorKind::Mul => (2.0, 0.11),
            OperatorKind::Div | OperatorKind::Rem => (3.0, 0.55),
            OperatorKind::And | OperatorKind::Or | OperatorKind::Xor | OperatorKind::Not => {
                (0.4, 0.0)
            }
            OperatorKind::ShiftLeft | OperatorKind::ShiftRight => (0.8, 0.02),
            OperatorKind::Eq | OperatorKind::Ne => (0.6, 0.01),
            OperatorKind::Lt | OperatorKind::Le | OperatorKind::Gt | OperatorKind::Ge => {
                (0.9, 0.03)
            }
        };
        let sign_penalty = if signed { 1.05 } else { 1.0 };
        (base + per_bit * w) * sign_penalty * self.fabric
    }

    fn report(&self) -> TimingReport {
        let mut report = TimingReport::new();
        for operator in OperatorKind::ALL {
            for width in WIDTHS {
                for signed in [false, true] {
                    let latency = self.latency(operator, width, signed);
                    report.insert(
                        TimingKey {
                            operator,
                            width,
                            signed,
                            constant: None,
                        },
                        round(latency),
                    );
                    if matches!(operator, OperatorKind::Mul | OperatorKind::Div) {
                        for constant in POWER_OF_TWO_CONSTANTS {
                            let shift = self.latency(OperatorKind::ShiftLeft, width, signed);
                            report.insert(
                                TimingKey {
                                    operator,
                                    width,
                                    signed,
                                    constant: Some(constant),
                                },
                                round(shift),
                            );
                        }
                    }
                }
            }
        }
        report
    }
}

fn round(ns: f64) -> f64 {
    (ns * 1000.0).round() / 1000.0
}

struct CatalogueEntry {
    name: &'static str,
    clock_mhz: f64,
    memory_size: u64,
    channels: &'static [Channel],
    fabric: f64,
}

const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        name: "Nexys A7-100T",
        clock_mhz: 100.0,
        memory_size: 128 * 1024 * 1024,
        channels: &[Channel::Serial, Channel::Ethernet],
        fabric: 1.0,
    },
    CatalogueEntry {
        name: "Alveo U250",
        clock_mhz: 300.0,
        memory_size: 64 * 1024 * 1024 * 1024,
        channels: &[Channel::Pcie],
        fabric: 0.6,
    },
];

/// Names of all built-in devices.
pub fn known_devices() -> Vec<&'static str> {
    CATALOGUE.iter().map(|e| e.name).collect()
}

/// Creates the driver of a built-in device. Names match case-insensitively.
///
/// # Errors
///
/// Returns [`DeviceError::UnknownDevice`] if no built-in device has the name.
pub fn load_device(name: &str) -> Result<StaticDeviceDriver, DeviceError> {
    let entry = CATALOGUE
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| DeviceError::UnknownDevice {
            name: name.to_string(),
            known: known_devices().join(", "),
        })?;
    let manifest = DeviceManifest {
        name: entry.name.to_string(),
        clock_frequency: Frequency::from_mhz(entry.clock_mhz),
        memory_size: entry.memory_size,
        channels: entry.channels.to_vec(),
    };
    let model = DelayModel {
        fabric: entry.fabric,
    };
    Ok(StaticDeviceDriver::new(manifest, model.report()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DeviceDriver;

    #[test]
    fn load_nexys() {
        let device = load_device("Nexys A7-100T").unwrap();
        assert_eq!(device.name(), "Nexys A7-100T");
        assert_eq!(device.manifest().clock_frequency.mhz(), 100.0);
        assert_eq!(device.manifest().memory_cells(), 32 * 1024 * 1024);
    }

    #[test]
    fn names_are_case_insensitive() {
        let device = load_device("alveo u250").unwrap();
        assert_eq!(device.name(), "Alveo U250");
        assert_eq!(device.manifest().channels, vec![Channel::Pcie]);
    }

    #[test]
    fn unknown_device_lists_known() {
        let err = load_device("Spartan-3").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Spartan-3"));
        assert!(text.contains("Nexys A7-100T"));
    }

    #[test]
    fn tables_cover_all_widths() {
        let device = load_device("Nexys A7-100T").unwrap();
        let report = device.timing_report();
        for op in OperatorKind::ALL {
            for width in WIDTHS {
                assert!(report.latency(op, width, true, None).is_some());
                assert!(report.latency(op, width, false, None).is_some());
            }
        }
    }

    #[test]
    fn latency_grows_with_width() {
        let device = load_device("Nexys A7-100T").unwrap();
        let report = device.timing_report();
        let narrow = report.latency(OperatorKind::Mul, 8, false, None).unwrap();
        let wide = report.latency(OperatorKind::Mul, 64, false, None).unwrap();
        assert!(wide > narrow);
    }

    #[test]
    fn power_of_two_multiplication_is_cheap() {
        let device = load_device("Nexys A7-100T").unwrap();
        let report = device.timing_report();
        let general = report.latency(OperatorKind::Mul, 32, false, None).unwrap();
        let by_four = report.latency(OperatorKind::Mul, 32, false, Some(4)).unwrap();
        assert!(by_four < general);
    }
}
