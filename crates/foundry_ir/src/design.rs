//! The assembled module.

use crate::process::Process;
use crate::signal::{Direction, Port, Signal};
use crate::types::{DataType, DependentTypesTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Name of the clock input port.
pub const CLOCK_PORT: &str = "Clock";
/// Name of the synchronous reset input port.
pub const RESET_PORT: &str = "Reset";

/// Structural problems found while assembling a design.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DesignError {
    /// Two different types were registered under one name.
    #[error("conflicting definitions for type `{name}`")]
    ConflictingType {
        /// The type name.
        name: String,
    },
    /// Custom types depend on each other cyclically.
    #[error("cyclic type dependency involving `{name}`")]
    CyclicTypes {
        /// A type on the cycle.
        name: String,
    },
    /// A signal is declared more than once.
    #[error("signal `{name}` is declared more than once")]
    DuplicateSignal {
        /// The signal name.
        name: String,
    },
    /// A signal or port is assigned by more than one process.
    #[error("`{name}` is driven by both `{first}` and `{second}`")]
    MultipleDrivers {
        /// The signal name.
        name: String,
        /// The first driving process.
        first: String,
        /// The second driving process.
        second: String,
    },
    /// A process assigns a signal it does not declare.
    #[error("process `{process}` assigns `{name}`, which it does not drive")]
    UndrivenAssignment {
        /// The signal name.
        name: String,
        /// The assigning process.
        process: String,
    },
    /// A process reads a signal nothing declares.
    #[error("process `{process}` reads undeclared signal `{name}`")]
    UndeclaredSignal {
        /// The signal name.
        name: String,
        /// The reading process.
        process: String,
    },
}

/// A complete generated module: ports, ordered type declarations and
/// processes with the signals they drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    /// Module name.
    pub name: String,
    /// Ports in declaration order.
    pub ports: Vec<Port>,
    /// Custom types in declaration order.
    pub types: Vec<DataType>,
    /// Processes in a stable order.
    pub processes: Vec<Process>,
}

impl Design {
    /// Assembles and validates a design.
    ///
    /// Every signal must be declared once, every assigned signal must be
    /// declared by its assigning process (or be an output port assigned by a
    /// single process), and every read signal must be declared.
    pub fn assemble(
        name: impl Into<String>,
        ports: Vec<Port>,
        processes: Vec<Process>,
    ) -> Result<Self, DesignError> {
        let mut declared: BTreeMap<&str, &str> = BTreeMap::new();
        for port in &ports {
            if declared.insert(&port.name, "").is_some() {
                return Err(DesignError::DuplicateSignal {
                    name: port.name.clone(),
                });
            }
        }
        for process in &processes {
            for signal in &process.signals {
                if declared.insert(&signal.name, &process.name).is_some() {
                    return Err(DesignError::DuplicateSignal {
                        name: signal.name.clone(),
                    });
                }
            }
        }

        let outputs: BTreeSet<&str> = ports
            .iter()
            .filter(|p| p.direction == Direction::Out)
            .map(|p| p.name.as_str())
            .collect();
        let mut port_drivers: BTreeMap<String, String> = BTreeMap::new();
        for process in &processes {
            for name in process.assigned_signals() {
                if outputs.contains(name.as_str()) {
                    if let Some(first) = port_drivers.insert(name.clone(), process.name.clone()) {
                        return Err(DesignError::MultipleDrivers {
                            name,
                            first,
                            second: process.name.clone(),
                        });
                    }
                    continue;
                }
                match declared.get(name.as_str()) {
                    Some(owner) if *owner == process.name => {}
                    Some(owner) if !owner.is_empty() => {
                        return Err(DesignError::MultipleDrivers {
                            name,
                            first: owner.to_string(),
                            second: process.name.clone(),
                        })
                    }
                    _ => {
                        return Err(DesignError::UndrivenAssignment {
                            name,
                            process: process.name.clone(),
                        })
                    }
                }
            }
            for name in process.read_signals() {
                if !declared.contains_key(name.as_str()) {
                    return Err(DesignError::UndeclaredSignal {
                        name,
                        process: process.name.clone(),
                    });
                }
            }
        }

        let mut table = DependentTypesTable::new();
        for port in &ports {
            table.add(&port.ty)?;
        }
        for process in &processes {
            for signal in &process.signals {
                table.add(&signal.ty)?;
            }
            for variable in &process.variables {
                table.add(&variable.ty)?;
            }
        }
        let types = table.ordered()?;

        Ok(Self {
            name: name.into(),
            ports,
            types,
            processes,
        })
    }

    /// Looks up a port by name.
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Iterates over every internal signal.
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.processes.iter().flat_map(|p| p.signals.iter())
    }

    /// Looks up an internal signal by name.
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals().find(|s| s.name == name)
    }

    /// Looks up a process by name.
    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::stmt::Statement;

    fn ports() -> Vec<Port> {
        vec![
            Port::input(CLOCK_PORT, DataType::StdLogic),
            Port::input("Started", DataType::Boolean),
            Port::output("Finished", DataType::Boolean),
        ]
    }

    fn driver(name: &str, signal: &str) -> Process {
        let mut p = Process::sequential(name);
        p.signals.push(Signal::new(signal, DataType::Boolean));
        p.body
            .push(Statement::assign_signal(signal, Expr::signal("Started")));
        p
    }

    #[test]
    fn assembles_valid_design() {
        let mut finisher = Process::sequential("finisher");
        finisher
            .body
            .push(Statement::assign_signal("Finished", Expr::signal("a")));
        let design =
            Design::assemble("Top", ports(), vec![driver("p", "a"), finisher]).unwrap();
        assert_eq!(design.signals().count(), 1);
        assert!(design.process("finisher").is_some());
        assert!(design.port("Finished").is_some());
    }

    #[test]
    fn duplicate_signal_rejected() {
        let err = Design::assemble("Top", ports(), vec![driver("p", "a"), driver("q", "a")]);
        assert!(matches!(err, Err(DesignError::DuplicateSignal { .. })));
    }

    #[test]
    fn assignment_to_foreign_signal_rejected() {
        let mut q = Process::sequential("q");
        q.body.push(Statement::assign_signal("a", Expr::bool(true)));
        let err = Design::assemble("Top", ports(), vec![driver("p", "a"), q]);
        assert!(matches!(err, Err(DesignError::MultipleDrivers { .. })));
    }

    #[test]
    fn two_port_drivers_rejected() {
        let mut a = Process::sequential("a");
        a.body.push(Statement::assign_signal("Finished", Expr::bool(true)));
        let mut b = Process::sequential("b");
        b.body.push(Statement::assign_signal("Finished", Expr::bool(false)));
        let err = Design::assemble("Top", ports(), vec![a, b]);
        assert!(matches!(err, Err(DesignError::MultipleDrivers { .. })));
    }

    #[test]
    fn undeclared_read_rejected() {
        let mut p = driver("p", "a");
        p.body
            .push(Statement::assign_signal("a", Expr::signal("missing")));
        let err = Design::assemble("Top", ports(), vec![p]);
        assert!(matches!(err, Err(DesignError::UndeclaredSignal { .. })));
    }
}
