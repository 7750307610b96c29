//! Signals, ports and process variables.

use crate::types::DataType;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Direction of a module port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Driven from outside the module.
    In,
    /// Driven by the module.
    Out,
}

/// A port of the generated module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    /// Port name.
    pub name: String,
    /// Direction.
    pub direction: Direction,
    /// Data type.
    pub ty: DataType,
}

impl Port {
    /// An input port.
    pub fn input(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            direction: Direction::In,
            ty,
        }
    }

    /// An output port.
    pub fn output(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Out,
            ty,
        }
    }
}

/// An internal signal. Assignments take effect at the end of the clock tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    /// Signal name.
    pub name: String,
    /// Data type.
    pub ty: DataType,
    /// Value after reset and at power-up.
    pub initial: Value,
}

impl Signal {
    /// A signal initialized to its type's default value.
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        let initial = Value::default_for(&ty);
        Self {
            name: name.into(),
            ty,
            initial,
        }
    }
}

/// A process variable. Assignments take effect immediately and the value
/// persists across clock ticks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    /// Data type.
    pub ty: DataType,
    /// Value at power-up.
    pub initial: Value,
}

impl Variable {
    /// A variable initialized to its type's default value.
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        let initial = Value::default_for(&ty);
        Self {
            name: name.into(),
            ty,
            initial,
        }
    }
}
