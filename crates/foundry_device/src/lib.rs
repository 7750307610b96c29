//! Target device descriptions for the Foundry compiler.
//!
//! A device is described by a [`DeviceManifest`] (clock, memory, channels) and
//! a [`TimingReport`] giving the latency of every operator the scheduler may
//! need. Both are reached through the [`DeviceDriver`] trait. Built-in devices
//! are created with [`load_device`]:
//!
//! ```
//! use foundry_device::{load_device, DeviceDriver};
//!
//! let device = load_device("Nexys A7-100T").unwrap();
//! assert_eq!(device.manifest().clock_frequency.mhz(), 100.0);
//! ```

#![warn(missing_docs)]

pub mod catalogue;
pub mod driver;
pub mod error;
pub mod manifest;
pub mod timing;

pub use catalogue::{known_devices, load_device};
pub use driver::{DeviceDriver, StaticDeviceDriver};
pub use error::DeviceError;
pub use manifest::{Channel, DeviceManifest};
pub use timing::{parse_timing_report, OperatorKind, TimingKey, TimingReport};
