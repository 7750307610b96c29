//! Simulation state and the values crossing the module boundary.

use foundry_ir::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything that persists between clock edges: internal signals, output
/// ports and process variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimState {
    /// Internal signals and output ports by name.
    pub signals: BTreeMap<String, Value>,
    /// Variables by process, then by name.
    pub variables: BTreeMap<String, BTreeMap<String, Value>>,
    /// Number of clock edges taken.
    pub cycle: u64,
}

impl SimState {
    /// The value of a signal or output port.
    pub fn signal(&self, name: &str) -> Option<&Value> {
        self.signals.get(name)
    }

    /// The value of a process variable.
    pub fn variable(&self, process: &str, name: &str) -> Option<&Value> {
        self.variables.get(process)?.get(name)
    }
}

/// Input port values for one clock edge. Ports left unset read as their
/// type's default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInputs {
    values: BTreeMap<String, Value>,
}

impl PortInputs {
    /// No inputs set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a port.
    pub fn set(&mut self, port: impl Into<String>, value: Value) {
        self.values.insert(port.into(), value);
    }

    /// Sets a port, builder style.
    pub fn with(mut self, port: impl Into<String>, value: Value) -> Self {
        self.set(port, value);
        self
    }

    /// Sets a boolean port.
    pub fn with_bool(self, port: impl Into<String>, value: bool) -> Self {
        self.with(port, Value::Bool(value))
    }

    /// Sets a 32-bit unsigned port.
    pub fn with_u32(self, port: impl Into<String>, value: u32) -> Self {
        self.with(port, Value::int(i128::from(value), 32, false))
    }

    /// The value set for a port.
    pub fn get(&self, port: &str) -> Option<&Value> {
        self.values.get(port)
    }

    /// Iterates over every set port.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// Output port values after a clock edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortOutputs {
    pub(crate) values: BTreeMap<String, Value>,
}

impl PortOutputs {
    /// The value of an output port.
    pub fn get(&self, port: &str) -> Option<&Value> {
        self.values.get(port)
    }

    /// A boolean output, `false` if absent or not boolean.
    pub fn bool(&self, port: &str) -> bool {
        self.get(port).and_then(Value::as_bool).unwrap_or(false)
    }

    /// An integer output, `0` if absent or not an integer.
    pub fn int(&self, port: &str) -> i128 {
        self.get(port).and_then(Value::as_int).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_typed_values() {
        let inputs = PortInputs::new()
            .with_bool("Started", true)
            .with_u32("MemberId", 3);
        assert_eq!(inputs.get("Started"), Some(&Value::Bool(true)));
        assert_eq!(inputs.get("MemberId").and_then(Value::as_int), Some(3));
        assert_eq!(inputs.iter().count(), 2);
    }

    #[test]
    fn missing_outputs_read_as_defaults() {
        let outputs = PortOutputs::default();
        assert!(!outputs.bool("Finished"));
        assert_eq!(outputs.int("DataOut"), 0);
    }

    #[test]
    fn state_serializes() {
        let state = SimState {
            signals: BTreeMap::from([("a".to_string(), Value::Bool(true))]),
            variables: BTreeMap::new(),
            cycle: 4,
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: SimState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
