use super::{InvocationSlot, SlotStates};
use crate::member::MemberInterface;
use crate::naming::{
    finished, forwarded_parameter_in, forwarded_parameter_out, forwarded_return,
    internal_proxy as proxy_name, invocation_finished, invocation_started, parameter_in,
    parameter_out, return_value, started,
};
use foundry_ir::{CaseArm, DataType, Expr, Process, Signal, Statement, Value, Variable};

/// Builds the dispatcher process of one member.
///
/// Each slot runs its own small state machine. An idle slot whose caller
/// raises `Started` takes the lowest-index replica that is neither busy nor
/// still showing `Finished` from its previous run, forwards the parameters
/// and starts it. Once the replica finishes, results and copied-back
/// parameters are published and the slot stays done until the caller drops
/// `Started`, so a level-high `Started` never restarts the callee.
pub fn internal_proxy(interface: &MemberInterface, slots: &[InvocationSlot]) -> Process {
    let member = interface.member.as_str();
    let name = proxy_name(member);
    let replicas = interface.component_names();
    let states = SlotStates::new(&name, 0..replicas.len());
    let mut process = Process::sequential(&name);

    for replica in &replicas {
        process
            .signals
            .push(Signal::new(started(replica), DataType::Boolean));
        for param in &interface.params {
            process
                .signals
                .push(Signal::new(parameter_in(replica, &param.name), param.ty.clone()));
        }
    }
    let busy: Vec<String> = (0..replicas.len())
        .map(|k| format!("{name}._Busy_{k}"))
        .collect();
    for flag in &busy {
        process.variables.push(Variable::new(flag, DataType::Boolean));
    }

    for slot in slots {
        let caller = slot.caller.as_str();
        let i = slot.index;
        process.signals.push(Signal::new(
            invocation_finished(caller, member, i),
            DataType::Boolean,
        ));
        if let Some(ty) = &interface.return_type {
            process
                .signals
                .push(Signal::new(forwarded_return(caller, member, i), ty.clone()));
        }
        for param in interface.params.iter().filter(|p| p.by_reference) {
            process.signals.push(Signal::new(
                forwarded_parameter_in(caller, member, &param.name, i),
                param.ty.clone(),
            ));
        }
        let state = slot_state(&name, slot);
        process
            .variables
            .push(Variable::new(&state, states.data_type()));
        process
            .body
            .push(dispatch(interface, &replicas, &busy, &states, slot, &state));
    }

    process.reset = process.initial_value_resets();
    process
}

fn slot_state(proxy: &str, slot: &InvocationSlot) -> String {
    format!("{proxy}.{}.{}._State", slot.caller, slot.index)
}

fn dispatch(
    interface: &MemberInterface,
    replicas: &[String],
    busy: &[String],
    states: &SlotStates,
    slot: &InvocationSlot,
    state: &str,
) -> Statement {
    let member = interface.member.as_str();
    let caller = slot.caller.as_str();
    let i = slot.index;
    let caller_started = Expr::signal(invocation_started(caller, member, i));
    let goto = |variant: &str| Statement::assign_variable(state, Expr::variant(variant));

    // Idle: allocate the lowest free replica.
    let mut allocate = Vec::new();
    for (k, replica) in replicas.iter().enumerate().rev() {
        let free = Expr::all(vec![
            Expr::invert(Expr::variable(&busy[k])),
            Expr::invert(Expr::signal(finished(replica))),
        ]);
        let mut start = vec![Statement::assign_variable(&busy[k], Expr::bool(true))];
        for param in &interface.params {
            start.push(Statement::assign_signal(
                parameter_in(replica, &param.name),
                Expr::signal(forwarded_parameter_out(caller, member, &param.name, i)),
            ));
        }
        start.push(Statement::assign_signal(started(replica), Expr::bool(true)));
        start.push(goto(&states.running[k]));
        allocate = vec![Statement::if_else(free, start, allocate)];
    }
    let mut arms = vec![CaseArm {
        choice: Value::Enum(states.idle.clone()),
        body: vec![Statement::when(caller_started.clone(), allocate)],
    }];

    // Running: wait for the replica, then publish its results.
    for (k, replica) in replicas.iter().enumerate() {
        let mut publish = Vec::new();
        if interface.return_type.is_some() {
            publish.push(Statement::assign_signal(
                forwarded_return(caller, member, i),
                Expr::signal(return_value(replica)),
            ));
        }
        for param in interface.params.iter().filter(|p| p.by_reference) {
            publish.push(Statement::assign_signal(
                forwarded_parameter_in(caller, member, &param.name, i),
                Expr::signal(parameter_out(replica, &param.name)),
            ));
        }
        publish.push(Statement::assign_signal(
            invocation_finished(caller, member, i),
            Expr::bool(true),
        ));
        publish.push(Statement::assign_signal(started(replica), Expr::bool(false)));
        publish.push(Statement::assign_variable(&busy[k], Expr::bool(false)));
        publish.push(goto(&states.done));
        arms.push(CaseArm {
            choice: Value::Enum(states.running[k].clone()),
            body: vec![Statement::when(Expr::signal(finished(replica)), publish)],
        });
    }

    arms.push(CaseArm {
        choice: Value::Enum(states.done.clone()),
        body: vec![Statement::when(
            Expr::invert(caller_started),
            vec![
                Statement::assign_signal(invocation_finished(caller, member, i), Expr::bool(false)),
                goto(&states.idle),
            ],
        )],
    });

    Statement::Case {
        subject: Expr::variable(state),
        arms,
        default: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::InterfaceParam;

    fn worker(instances: u32) -> MemberInterface {
        MemberInterface {
            member: "Ns.T::Worker".to_string(),
            params: vec![
                InterfaceParam {
                    name: "seed".to_string(),
                    ty: DataType::int(32, false),
                    by_reference: false,
                },
                InterfaceParam {
                    name: "buffer".to_string(),
                    ty: DataType::array(DataType::int(32, false), 4),
                    by_reference: true,
                },
            ],
            return_type: Some(DataType::int(32, false)),
            instances,
        }
    }

    fn slot(caller: &str, index: u32) -> InvocationSlot {
        InvocationSlot {
            caller: caller.to_string(),
            index,
        }
    }

    #[test]
    fn drives_replica_inputs_and_caller_results() {
        let process = internal_proxy(&worker(2), &[slot("Ns.T::Run", 0), slot("Ns.T::Run", 1)]);
        assert_eq!(process.name, "Ns.T::Worker.InvocationProxy");
        let names: Vec<&str> = process.signals.iter().map(|s| s.name.as_str()).collect();
        for expected in [
            "Ns.T::Worker.0.Started",
            "Ns.T::Worker.1.seed.parameter.In",
            "Ns.T::Run.Ns.T::Worker.1.Finished",
            "Ns.T::Run.Ns.T::Worker.return.0",
            "Ns.T::Run.Ns.T::Worker.buffer.parameter.In.1",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert!(!names.contains(&"Ns.T::Run.Ns.T::Worker.seed.parameter.In.0"));
        assert_eq!(process.body.len(), 2);
    }

    #[test]
    fn reads_caller_and_replica_outputs() {
        let process = internal_proxy(&worker(1), &[slot("Ns.T::Run", 0)]);
        let reads = process.read_signals();
        for expected in [
            "Ns.T::Run.Ns.T::Worker.0.Started",
            "Ns.T::Run.Ns.T::Worker.seed.parameter.Out.0",
            "Ns.T::Worker.Finished",
            "Ns.T::Worker.return",
            "Ns.T::Worker.buffer.parameter.Out",
        ] {
            assert!(reads.contains(expected), "missing {expected}");
        }
        let driven: Vec<String> = process.signals.iter().map(|s| s.name.clone()).collect();
        for assigned in process.assigned_signals() {
            assert!(driven.contains(&assigned));
        }
    }

    #[test]
    fn member_without_callers_still_holds_replica_inputs() {
        let process = internal_proxy(&worker(1), &[]);
        assert!(process.body.is_empty());
        assert!(process
            .signals
            .iter()
            .any(|s| s.name == "Ns.T::Worker.Started"));
        assert_eq!(process.reset.len(), process.signals.len() + process.variables.len());
    }
}
