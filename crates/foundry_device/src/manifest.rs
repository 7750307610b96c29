//! Static capabilities of a device.

use foundry_common::Frequency;
use serde::{Deserialize, Serialize};

/// A host communication channel a device supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// UART over USB.
    Serial,
    /// Raw Ethernet.
    Ethernet,
    /// PCI Express.
    Pcie,
}

/// Clock, memory and connectivity of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceManifest {
    /// Device name as used in configuration.
    pub name: String,
    /// Frequency of the clock driving the generated design.
    pub clock_frequency: Frequency,
    /// Size of the shared memory in bytes.
    pub memory_size: u64,
    /// Supported host channels.
    pub channels: Vec<Channel>,
}

impl DeviceManifest {
    /// Number of 32-bit cells the shared memory holds.
    pub fn memory_cells(&self) -> u64 {
        self.memory_size / 4
    }
}
