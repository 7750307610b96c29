use super::SlotStates;
use crate::member::MemberInterface;
use crate::member_ids::MemberIdTable;
use crate::naming::{
    forwarded_parameter_out, invocation_finished, invocation_started, EXTERNAL_PROXY,
    FINISHED_PORT, MEMBER_ID_PORT, STARTED_PORT,
};
use foundry_ir::{CaseArm, DataType, Expr, Process, Signal, Statement, Value, Variable};

/// Builds the host-facing dispatcher.
///
/// While the `Started` port is high, the entry point whose ID is on the
/// `MemberId` port is invoked through its internal proxy like any other
/// call; `Finished` rises once it completes and falls after the host drops
/// `Started`. An ID matching no entry point starts nothing and never
/// finishes.
///
/// Entry points receive their parameters at their default values; hosts
/// exchange data through memory.
pub fn external_proxy(ids: &MemberIdTable, entries: &[&MemberInterface]) -> Process {
    let ordered: Vec<(u32, &MemberInterface)> = entries
        .iter()
        .filter_map(|e| ids.id_of(&e.member).map(|id| (id, *e)))
        .collect();
    let states = SlotStates::new(EXTERNAL_PROXY, ordered.iter().map(|(id, _)| id));
    let state = format!("{EXTERNAL_PROXY}._State");
    let goto = |variant: &str| Statement::assign_variable(&state, Expr::variant(variant));

    let mut process = Process::sequential(EXTERNAL_PROXY);
    for (_, entry) in &ordered {
        let member = entry.member.as_str();
        process.signals.push(Signal::new(
            invocation_started(EXTERNAL_PROXY, member, 0),
            DataType::Boolean,
        ));
        for param in &entry.params {
            process.signals.push(Signal::new(
                forwarded_parameter_out(EXTERNAL_PROXY, member, &param.name, 0),
                param.ty.clone(),
            ));
        }
    }
    process
        .variables
        .push(Variable::new(&state, states.data_type()));

    let mut select = Vec::new();
    for (position, (id, entry)) in ordered.iter().enumerate().rev() {
        let matches = Expr::equals(
            Expr::signal(MEMBER_ID_PORT),
            Expr::int(i128::from(*id), 32, false),
        );
        let start = vec![
            Statement::assign_signal(
                invocation_started(EXTERNAL_PROXY, &entry.member, 0),
                Expr::bool(true),
            ),
            goto(&states.running[position]),
        ];
        select = vec![Statement::if_else(matches, start, select)];
    }
    let mut arms = vec![CaseArm {
        choice: Value::Enum(states.idle.clone()),
        body: vec![Statement::when(Expr::signal(STARTED_PORT), select)],
    }];
    for (position, (_, entry)) in ordered.iter().enumerate() {
        arms.push(CaseArm {
            choice: Value::Enum(states.running[position].clone()),
            body: vec![Statement::when(
                Expr::signal(invocation_finished(EXTERNAL_PROXY, &entry.member, 0)),
                vec![
                    Statement::assign_signal(
                        invocation_started(EXTERNAL_PROXY, &entry.member, 0),
                        Expr::bool(false),
                    ),
                    Statement::assign_signal(FINISHED_PORT, Expr::bool(true)),
                    goto(&states.done),
                ],
            )],
        });
    }
    arms.push(CaseArm {
        choice: Value::Enum(states.done.clone()),
        body: vec![Statement::when(
            Expr::invert(Expr::signal(STARTED_PORT)),
            vec![
                Statement::assign_signal(FINISHED_PORT, Expr::bool(false)),
                goto(&states.idle),
            ],
        )],
    });
    process.body = vec![Statement::Case {
        subject: Expr::variable(&state),
        arms,
        default: Vec::new(),
    }];

    process.reset = process.initial_value_resets();
    process
        .reset
        .push(Statement::assign_signal(FINISHED_PORT, Expr::bool(false)));
    process
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::InterfaceParam;

    fn entry(member: &str) -> MemberInterface {
        MemberInterface {
            member: member.to_string(),
            params: vec![InterfaceParam {
                name: "a".to_string(),
                ty: DataType::int(32, false),
                by_reference: false,
            }],
            return_type: None,
            instances: 1,
        }
    }

    #[test]
    fn one_running_state_per_entry_point() {
        let run = entry("Ns.K::Run");
        let sum = entry("Ns.K::Sum");
        let ids = MemberIdTable::from_entry_points(&[run.member.clone(), sum.member.clone()]);
        let process = external_proxy(&ids, &[&run, &sum]);
        assert_eq!(process.name, EXTERNAL_PROXY);
        match &process.body[0] {
            Statement::Case { arms, .. } => assert_eq!(arms.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
        let names: Vec<&str> = process.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "ExternalInvocationProxy.Ns.K::Run.0.Started",
                "ExternalInvocationProxy.Ns.K::Run.a.parameter.Out.0",
                "ExternalInvocationProxy.Ns.K::Sum.0.Started",
                "ExternalInvocationProxy.Ns.K::Sum.a.parameter.Out.0",
            ]
        );
    }

    #[test]
    fn drives_the_finished_port() {
        let run = entry("Ns.K::Run");
        let ids = MemberIdTable::from_entry_points(&[run.member.clone()]);
        let process = external_proxy(&ids, &[&run]);
        assert!(process.assigned_signals().contains(FINISHED_PORT));
        let reads = process.read_signals();
        assert!(reads.contains(MEMBER_ID_PORT));
        assert!(reads.contains(STARTED_PORT));
        assert!(reads.contains("ExternalInvocationProxy.Ns.K::Run.0.Finished"));
    }
}
