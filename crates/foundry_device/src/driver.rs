//! The device abstraction used by the scheduler.

use crate::manifest::DeviceManifest;
use crate::timing::TimingReport;

/// A target device.
///
/// Implementations must be shareable across the threads transforming members
/// in parallel.
pub trait DeviceDriver: std::fmt::Debug + Send + Sync {
    /// Clock, memory and channel capabilities.
    fn manifest(&self) -> &DeviceManifest;

    /// Operator latencies.
    fn timing_report(&self) -> &TimingReport;

    /// The device name.
    fn name(&self) -> &str {
        &self.manifest().name
    }
}

/// A device described entirely by data.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticDeviceDriver {
    manifest: DeviceManifest,
    timing: TimingReport,
}

impl StaticDeviceDriver {
    /// Creates a driver from a manifest and a timing report.
    pub fn new(manifest: DeviceManifest, timing: TimingReport) -> Self {
        Self { manifest, timing }
    }

    /// Mutable access to the timing report, for tailoring a built-in device.
    pub fn timing_report_mut(&mut self) -> &mut TimingReport {
        &mut self.timing
    }

    /// Mutable access to the manifest.
    pub fn manifest_mut(&mut self) -> &mut DeviceManifest {
        &mut self.manifest
    }
}

impl DeviceDriver for StaticDeviceDriver {
    fn manifest(&self) -> &DeviceManifest {
        &self.manifest
    }

    fn timing_report(&self) -> &TimingReport {
        &self.timing
    }
}
