//! State machines produced from transformed members.

use crate::expr::Expr;
use crate::process::Process;
use crate::signal::{Signal, Variable};
use crate::stmt::{CaseArm, Statement, Target};
use crate::types::DataType;
use crate::value::Value;
use foundry_diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};

/// An operation whose result needs more than the clock cycle it is issued in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultiCycleOperation {
    /// The signal holding the operation's result.
    pub result: String,
    /// Clock cycles the operation needs, at least 1.
    pub cycles: u32,
}

/// One state of a state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Statements run while the machine is in this state.
    pub body: Vec<Statement>,
    /// Fraction of clock cycles the state's logic needs; above 1.0 the state
    /// is a multi-cycle state.
    pub required_clock_cycles: f64,
}

impl State {
    /// An empty state.
    pub fn new() -> Self {
        Self {
            body: Vec::new(),
            required_clock_cycles: 0.0,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// The hardware unit produced from one member.
///
/// State 0 waits for `Started`, state 1 signals `Finished`; the body starts
/// at state 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureComponent {
    /// Component name: the member's full name, or `{name}.{i}` for replicas.
    pub name: String,
    /// States in index order.
    pub states: Vec<State>,
    /// Process variables (locals of the member and lowering temporaries).
    pub variables: Vec<Variable>,
    /// Signals driven by this component.
    pub signals: Vec<Signal>,
    /// Operations needing more than one clock cycle, or recorded for timing.
    pub multi_cycle_operations: Vec<MultiCycleOperation>,
}

impl ArchitectureComponent {
    /// Index of the state waiting for `Started`.
    pub const WAIT_FOR_STARTED: usize = 0;
    /// Index of the state asserting `Finished`.
    pub const FINISHED: usize = 1;

    /// A component without states.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            variables: Vec::new(),
            signals: Vec::new(),
            multi_cycle_operations: Vec::new(),
        }
    }

    /// Appends an empty state and returns its index.
    pub fn add_state(&mut self) -> usize {
        self.states.push(State::new());
        self.states.len() - 1
    }

    /// Name of the state enumeration type.
    pub fn state_type_name(&self) -> String {
        format!("{}._States", self.name)
    }

    /// Name of the variable holding the current state.
    pub fn state_variable_name(&self) -> String {
        format!("{}._State", self.name)
    }

    /// Name of the enumeration variant for a state index.
    pub fn state_name(&self, index: usize) -> String {
        format!("{}._State_{index}", self.name)
    }

    /// The state enumeration type.
    pub fn state_type(&self) -> DataType {
        DataType::Enum {
            name: self.state_type_name(),
            variants: (0..self.states.len()).map(|i| self.state_name(i)).collect(),
        }
    }

    /// A statement moving the machine to `index` on the next clock tick.
    pub fn transition_to(&self, index: usize) -> Statement {
        Statement::assign(
            Target::variable(self.state_variable_name()),
            Expr::variant(self.state_name(index)),
        )
    }

    /// Declares a signal driven by this component unless already declared.
    pub fn declare_signal(&mut self, signal: Signal) {
        if !self.signals.iter().any(|s| s.name == signal.name) {
            self.signals.push(signal);
        }
    }

    /// Declares a variable unless already declared.
    pub fn declare_variable(&mut self, variable: Variable) {
        if !self.variables.iter().any(|v| v.name == variable.name) {
            self.variables.push(variable);
        }
    }

    /// Builds the clocked process running this state machine.
    pub fn to_process(&self) -> Process {
        let mut process = Process::sequential(&self.name);
        process.signals = self.signals.clone();
        let state_type = self.state_type();
        let initial_state = Value::default_for(&state_type);
        process.variables.push(Variable {
            name: self.state_variable_name(),
            ty: state_type,
            initial: initial_state,
        });
        process.variables.extend(self.variables.iter().cloned());
        process.reset = process.initial_value_resets();
        let arms = self
            .states
            .iter()
            .enumerate()
            .map(|(index, state)| CaseArm {
                choice: Value::Enum(self.state_name(index)),
                body: state.body.clone(),
            })
            .collect();
        process.body = vec![Statement::Case {
            subject: Expr::variable(self.state_variable_name()),
            arms,
            default: Vec::new(),
        }];
        process
    }

    /// Bundles the component with its process, declarations and warnings.
    pub fn into_result(self, warnings: Vec<Diagnostic>) -> ArchitectureComponentResult {
        let body = self.to_process();
        let declarations = custom_types(&body);
        ArchitectureComponentResult {
            component: self,
            declarations,
            body,
            warnings,
        }
    }
}

/// Everything one transformed member contributes to the design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureComponentResult {
    /// The state machine.
    pub component: ArchitectureComponent,
    /// Custom types used by the component's signals and variables.
    pub declarations: Vec<DataType>,
    /// The generated process.
    pub body: Process,
    /// Non-fatal findings.
    pub warnings: Vec<Diagnostic>,
}

impl ArchitectureComponentResult {
    /// Wraps a hand-built process, as proxies produce.
    pub fn from_process(body: Process) -> Self {
        let declarations = custom_types(&body);
        Self {
            component: ArchitectureComponent::new(&body.name),
            declarations,
            body,
            warnings: Vec::new(),
        }
    }
}

fn custom_types(process: &Process) -> Vec<DataType> {
    let mut out: Vec<DataType> = Vec::new();
    let types = process
        .signals
        .iter()
        .map(|s| &s.ty)
        .chain(process.variables.iter().map(|v| &v.ty));
    for ty in types {
        if ty.is_custom() && !out.contains(ty) {
            out.push(ty.clone());
        }
    }
    out
}
