//! Cycle-based simulator for designs generated by Foundry.
//!
//! The simulator executes an assembled [`Design`](foundry_ir::Design) one
//! rising clock edge at a time. State is explicit: [`Simulator::step`] maps
//! a state and the input port values to the next state and the output port
//! values, so runs are reproducible and can be forked.
//!
//! # Usage
//!
//! ```ignore
//! let mut memory = SimMemory::from_cells(vec![1, 2, 3]);
//! let cycles = run_member(&design, member_id, &mut memory, 10_000)?;
//! ```
//!
//! # Modules
//!
//! - `error`: Simulation error types
//! - `state`: Simulation state and port values
//! - `evaluator`: Expression evaluation and statement execution
//! - `kernel`: The clocked transition function
//! - `memory`: Simulated cell memory
//! - `host`: Host-style invocation of entry points

#![warn(missing_docs)]

pub mod error;
pub mod evaluator;
pub mod host;
pub mod kernel;
pub mod memory;
pub mod state;

pub use error::SimError;
pub use host::{run_member, Host};
pub use kernel::{Simulator, MAX_SETTLE_ITERATIONS};
pub use memory::SimMemory;
pub use state::{PortInputs, PortOutputs, SimState};
