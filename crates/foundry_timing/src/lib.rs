//! Multi-cycle scheduling support for the Foundry compiler.
//!
//! Converts operator latencies from a device [`TimingReport`] into clock
//! cycle counts, and turns the multi-cycle operations recorded during
//! lowering into timing constraints for the vendor toolchain.
//!
//! - [`cycles`]: latency to clock-cycle conversion and the [`OperationTimer`]
//! - [`constraints`]: XDC `set_multicycle_path` emission
//!
//! [`TimingReport`]: foundry_device::TimingReport

#![warn(missing_docs)]

pub mod constraints;
pub mod cycles;

pub use constraints::write_constraints;
pub use cycles::{latency_to_cycles, ClockCycles, OperationTimer, TimingError};
