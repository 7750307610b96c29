//! Host-side driver invoking entry points through the module ports.

use crate::error::SimError;
use crate::kernel::Simulator;
use crate::memory::SimMemory;
use crate::state::{PortInputs, SimState};
use foundry_ir::{Design, Value};
use tracing::debug;

const MEMBER_ID_PORT: &str = "MemberId";
const STARTED_PORT: &str = "Started";
const FINISHED_PORT: &str = "Finished";

/// A reset design with state kept across invocations.
pub struct Host<'d> {
    simulator: Simulator<'d>,
    state: SimState,
}

impl<'d> Host<'d> {
    /// Resets `design` and wraps it.
    pub fn new(design: &'d Design) -> Result<Self, SimError> {
        let simulator = Simulator::new(design);
        let state = simulator.reset()?;
        Ok(Self { simulator, state })
    }

    /// The current state.
    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Invokes the entry point with `member_id` and waits for it.
    ///
    /// Raises `Started` with the ID on `MemberId` until `Finished` rises,
    /// then drops `Started` and waits for `Finished` to fall. Returns the
    /// number of edges until `Finished` rose.
    pub fn invoke(
        &mut self,
        member_id: u32,
        memory: &mut SimMemory,
        max_cycles: u64,
    ) -> Result<u64, SimError> {
        let mut inputs = PortInputs::new()
            .with_u32(MEMBER_ID_PORT, member_id)
            .with_bool(STARTED_PORT, true);
        let mut cycles = 0;
        loop {
            if cycles >= max_cycles {
                return Err(SimError::Timeout { cycles: max_cycles });
            }
            let (state, outputs) = self.simulator.step(&self.state, &inputs)?;
            self.state = state;
            cycles += 1;
            memory.respond(&outputs, &mut inputs)?;
            if outputs.bool(FINISHED_PORT) {
                break;
            }
        }
        debug!(member_id, cycles, "member finished");

        inputs.set(STARTED_PORT, Value::Bool(false));
        let mut released = 0;
        loop {
            if released >= max_cycles {
                return Err(SimError::Timeout { cycles: max_cycles });
            }
            let (state, outputs) = self.simulator.step(&self.state, &inputs)?;
            self.state = state;
            released += 1;
            memory.respond(&outputs, &mut inputs)?;
            if !outputs.bool(FINISHED_PORT) {
                return Ok(cycles);
            }
        }
    }
}

/// Resets `design`, invokes one entry point and returns the number of
/// edges until it finished.
pub fn run_member(
    design: &Design,
    member_id: u32,
    memory: &mut SimMemory,
    max_cycles: u64,
) -> Result<u64, SimError> {
    Host::new(design)?.invoke(member_id, memory, max_cycles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_ir::{
        BinaryOp, DataType, Expr, Port, Process, Statement, Variable, CLOCK_PORT,
        RESET_PORT,
    };

    /// Finishes a fixed number of edges after `Started` rises.
    fn delay_design(delay: i128) -> Design {
        let ports = vec![
            Port::input(CLOCK_PORT, DataType::StdLogic),
            Port::input(RESET_PORT, DataType::StdLogic),
            Port::input(MEMBER_ID_PORT, DataType::Unsigned(32)),
            Port::input(STARTED_PORT, DataType::Boolean),
            Port::output(FINISHED_PORT, DataType::Boolean),
            Port::input("DataIn", DataType::Unsigned(32)),
            Port::input("ReadsDone", DataType::Boolean),
            Port::input("WritesDone", DataType::Boolean),
        ];
        let increment = Expr::binary(
            BinaryOp::Add,
            Expr::variable("n"),
            Expr::int(1, 8, false),
            DataType::Unsigned(8),
        );
        let mut p = Process::sequential("delay");
        p.variables.push(Variable::new("n", DataType::Unsigned(8)));
        p.body = vec![Statement::if_else(
            Expr::signal(STARTED_PORT),
            vec![
                Statement::assign_variable("n", increment),
                Statement::when(
                    Expr::equals(Expr::variable("n"), Expr::int(delay, 8, false)),
                    vec![Statement::assign_signal(FINISHED_PORT, Expr::bool(true))],
                ),
            ],
            vec![
                Statement::assign_variable("n", Expr::int(0, 8, false)),
                Statement::assign_signal(FINISHED_PORT, Expr::bool(false)),
            ],
        )];
        p.reset = p.initial_value_resets();
        p.reset
            .push(Statement::assign_signal(FINISHED_PORT, Expr::bool(false)));
        Design::assemble("Delay", ports, vec![p]).unwrap()
    }

    #[test]
    fn counts_edges_until_finished() {
        let design = delay_design(3);
        let cycles = run_member(&design, 0, &mut SimMemory::new(0), 10).unwrap();
        assert_eq!(cycles, 3);
    }

    #[test]
    fn repeated_invocations_reuse_state() {
        let design = delay_design(2);
        let mut host = Host::new(&design).unwrap();
        let mut memory = SimMemory::new(0);
        assert_eq!(host.invoke(0, &mut memory, 10).unwrap(), 2);
        assert_eq!(host.invoke(0, &mut memory, 10).unwrap(), 2);
        assert!(host.state().cycle >= 6);
    }

    #[test]
    fn never_finishing_times_out() {
        let design = delay_design(100);
        let err = run_member(&design, 0, &mut SimMemory::new(0), 20).unwrap_err();
        assert_eq!(err, SimError::Timeout { cycles: 20 });
    }
}
