//! The clocked transition function over an assembled design.

use crate::error::SimError;
use crate::evaluator::Frame;
use crate::state::{PortInputs, PortOutputs, SimState};
use foundry_ir::{Design, Direction, Process, ProcessKind, Value, RESET_PORT};
use std::collections::BTreeMap;
use tracing::trace;

/// Maximum number of passes over the combinational processes per settle.
pub const MAX_SETTLE_ITERATIONS: usize = 64;

/// Cycle-based simulator of one design.
///
/// Each [`step`](Simulator::step) is one rising clock edge: every sequential
/// process reads the pre-edge signal values and its writes become visible
/// together after the edge. Combinational processes are settled before and
/// after the edge.
pub struct Simulator<'d> {
    design: &'d Design,
}

impl<'d> Simulator<'d> {
    /// Creates a simulator for `design`.
    pub fn new(design: &'d Design) -> Self {
        Self { design }
    }

    /// The simulated design.
    pub fn design(&self) -> &'d Design {
        self.design
    }

    /// Power-up state: every signal, output port and variable at its
    /// initial value.
    pub fn initial_state(&self) -> SimState {
        let mut signals = BTreeMap::new();
        for port in &self.design.ports {
            if port.direction == Direction::Out {
                signals.insert(port.name.clone(), Value::default_for(&port.ty));
            }
        }
        for signal in self.design.signals() {
            signals.insert(signal.name.clone(), signal.initial.clone());
        }
        let variables = self
            .design
            .processes
            .iter()
            .map(|p| (p.name.clone(), initial_variables(p)))
            .collect();
        SimState {
            signals,
            variables,
            cycle: 0,
        }
    }

    /// Power-up followed by one edge with the reset port high.
    pub fn reset(&self) -> Result<SimState, SimError> {
        let inputs = PortInputs::new().with(RESET_PORT, Value::Bool(true));
        let (mut state, _) = self.step(&self.initial_state(), &inputs)?;
        state.cycle = 0;
        Ok(state)
    }

    /// Takes one clock edge.
    pub fn step(
        &self,
        state: &SimState,
        inputs: &PortInputs,
    ) -> Result<(SimState, PortOutputs), SimError> {
        let inputs = self.resolve_inputs(inputs)?;
        let mut current = state.signals.clone();
        self.settle(&mut current, &inputs)?;

        let reset = inputs
            .get(RESET_PORT)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let mut next = current.clone();
        let mut variables = state.variables.clone();
        for process in self.processes(ProcessKind::Sequential) {
            let locals = variables.entry(process.name.clone()).or_default();
            let mut frame = Frame::new(&process.name, &inputs, &current, locals);
            frame.exec(if reset { &process.reset } else { &process.body })?;
            next.extend(frame.into_pending());
        }
        self.settle(&mut next, &inputs)?;

        let outputs = PortOutputs {
            values: self
                .design
                .ports
                .iter()
                .filter(|p| p.direction == Direction::Out)
                .filter_map(|p| Some((p.name.clone(), next.get(&p.name)?.clone())))
                .collect(),
        };
        trace!(cycle = state.cycle + 1, reset, "clock edge");
        Ok((
            SimState {
                signals: next,
                variables,
                cycle: state.cycle + 1,
            },
            outputs,
        ))
    }

    /// Runs combinational processes until no signal changes.
    fn settle(
        &self,
        signals: &mut BTreeMap<String, Value>,
        inputs: &BTreeMap<String, Value>,
    ) -> Result<(), SimError> {
        for _ in 0..MAX_SETTLE_ITERATIONS {
            let mut changed = false;
            for process in self.processes(ProcessKind::Combinational) {
                let mut locals = initial_variables(process);
                let mut frame = Frame::new(&process.name, inputs, signals, &mut locals);
                frame.exec(&process.body)?;
                let pending = frame.into_pending();
                for (name, value) in pending {
                    if signals.get(&name) != Some(&value) {
                        signals.insert(name, value);
                        changed = true;
                    }
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Err(SimError::CombinationalLoop {
            iterations: MAX_SETTLE_ITERATIONS,
        })
    }

    /// Every input port with its value for this edge.
    fn resolve_inputs(&self, inputs: &PortInputs) -> Result<BTreeMap<String, Value>, SimError> {
        for (name, _) in inputs.iter() {
            let is_input = self
                .design
                .port(name)
                .is_some_and(|p| p.direction == Direction::In);
            if !is_input {
                return Err(SimError::NotAnInput { name: name.clone() });
            }
        }
        Ok(self
            .design
            .ports
            .iter()
            .filter(|p| p.direction == Direction::In)
            .map(|p| {
                let value = inputs
                    .get(&p.name)
                    .cloned()
                    .unwrap_or_else(|| Value::default_for(&p.ty));
                (p.name.clone(), value)
            })
            .collect())
    }

    fn processes(&self, kind: ProcessKind) -> impl Iterator<Item = &'d Process> {
        self.design.processes.iter().filter(move |p| p.kind == kind)
    }
}

fn initial_variables(process: &Process) -> BTreeMap<String, Value> {
    process
        .variables
        .iter()
        .map(|v| (v.name.clone(), v.initial.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_ir::{DataType, Expr, Port, Signal, Statement, Variable, CLOCK_PORT};

    /// A counter that increments while `Enable` is high, with its value on
    /// `Count` through a combinational process.
    fn counter() -> Design {
        let ports = vec![
            Port::input(CLOCK_PORT, DataType::StdLogic),
            Port::input(RESET_PORT, DataType::StdLogic),
            Port::input("Enable", DataType::Boolean),
            Port::output("Count", DataType::Unsigned(8)),
        ];
        let mut seq = Process::sequential("counter");
        seq.signals.push(Signal::new("value", DataType::Unsigned(8)));
        seq.variables.push(Variable::new("ticks", DataType::Unsigned(8)));
        seq.body = vec![Statement::when(
            Expr::signal("Enable"),
            vec![
                Statement::assign_signal(
                    "value",
                    Expr::binary(
                        foundry_ir::BinaryOp::Add,
                        Expr::signal("value"),
                        Expr::int(1, 8, false),
                        DataType::Unsigned(8),
                    ),
                ),
                Statement::assign_variable(
                    "ticks",
                    Expr::binary(
                        foundry_ir::BinaryOp::Add,
                        Expr::variable("ticks"),
                        Expr::int(1, 8, false),
                        DataType::Unsigned(8),
                    ),
                ),
            ],
        )];
        seq.reset = seq.initial_value_resets();
        let mut comb = Process::combinational("out");
        comb.body = vec![Statement::assign_signal("Count", Expr::signal("value"))];
        Design::assemble("Counter", ports, vec![seq, comb]).unwrap()
    }

    #[test]
    fn sequential_writes_land_after_the_edge() {
        let design = counter();
        let sim = Simulator::new(&design);
        let enable = PortInputs::new().with_bool("Enable", true);
        let (state, out) = sim.step(&sim.initial_state(), &enable).unwrap();
        assert_eq!(out.int("Count"), 1);
        let (state, out) = sim.step(&state, &enable).unwrap();
        assert_eq!(out.int("Count"), 2);
        assert_eq!(state.cycle, 2);
        assert_eq!(state.variable("counter", "ticks").and_then(Value::as_int), Some(2));

        let (_, out) = sim.step(&state, &PortInputs::new()).unwrap();
        assert_eq!(out.int("Count"), 2);
    }

    #[test]
    fn reset_restores_initial_values() {
        let design = counter();
        let sim = Simulator::new(&design);
        let enable = PortInputs::new().with_bool("Enable", true);
        let (state, _) = sim.step(&sim.initial_state(), &enable).unwrap();
        let reset = enable.with_bool(RESET_PORT, true);
        let (state, out) = sim.step(&state, &reset).unwrap();
        assert_eq!(out.int("Count"), 0);
        assert_eq!(state.signal("value").and_then(Value::as_int), Some(0));
    }

    #[test]
    fn unknown_input_rejected() {
        let design = counter();
        let sim = Simulator::new(&design);
        let bad = PortInputs::new().with_bool("Count", true);
        assert_eq!(
            sim.step(&sim.initial_state(), &bad).unwrap_err(),
            SimError::NotAnInput {
                name: "Count".into()
            }
        );
    }

    #[test]
    fn combinational_loop_detected() {
        let ports = vec![Port::input(CLOCK_PORT, DataType::StdLogic)];
        let mut comb = Process::combinational("osc");
        comb.signals.push(Signal::new("a", DataType::Boolean));
        comb.body = vec![Statement::assign_signal("a", Expr::invert(Expr::signal("a")))];
        let design = Design::assemble("Osc", ports, vec![comb]).unwrap();
        let sim = Simulator::new(&design);
        assert!(matches!(
            sim.step(&sim.initial_state(), &PortInputs::new()),
            Err(SimError::CombinationalLoop { .. })
        ));
    }

    #[test]
    fn stepping_is_pure() {
        let design = counter();
        let sim = Simulator::new(&design);
        let enable = PortInputs::new().with_bool("Enable", true);
        let start = sim.reset().unwrap();
        let a = sim.step(&start, &enable).unwrap();
        let b = sim.step(&start, &enable).unwrap();
        assert_eq!(a, b);
        assert_eq!(start.cycle, 0);
    }
}
