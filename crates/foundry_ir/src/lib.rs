//! Hardware IR for the Foundry compiler.
//!
//! Every transformed member becomes an [`ArchitectureComponent`]: a list of
//! [`State`]s lowered into one clocked [`Process`]. Proxies contribute plain
//! processes. The assembler gathers all of them into a [`Design`], which the
//! [`vhdl`] module renders and the simulator executes.
//!
//! Signals and variables are referenced by name. Every signal has exactly one
//! driving process; its declaration travels with that process.

#![warn(missing_docs)]

pub mod component;
pub mod design;
pub mod expr;
pub mod process;
pub mod signal;
pub mod stmt;
pub mod types;
pub mod value;
pub mod vhdl;

pub use component::{
    ArchitectureComponent, ArchitectureComponentResult, MultiCycleOperation, State,
};
pub use design::{Design, DesignError, CLOCK_PORT, RESET_PORT};
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use process::{Process, ProcessKind};
pub use signal::{Direction, Port, Signal, Variable};
pub use stmt::{CaseArm, Statement, Target};
pub use types::{DataType, DependentTypesTable};
pub use value::Value;
pub use vhdl::{escape_identifier, render_vhdl};
