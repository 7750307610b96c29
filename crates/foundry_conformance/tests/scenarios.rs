//! End-to-end transformation scenarios.
//!
//! Each test builds a small program, runs it through the whole pipeline on
//! the default device and checks the observable result: member IDs, timing
//! records, the assembled design or the error that aborted the run.

use foundry_conformance::{
    adder, component, conflicting_lengths, entry_config, fan_out, has_branch_on, run, run_on,
    shared_constants, wide_signed_multiply,
};
use foundry_config::DEFAULT_DEVICE;
use foundry_device::{load_device, OperatorKind, TimingKey};
use foundry_transform::naming::{forwarded_parameter_out, invocation_finished};
use foundry_transform::prune::prune;
use foundry_transform::{ErrorKind, Program, TransformationContext};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// One adder at 100 MHz
// ---------------------------------------------------------------------------

#[test]
fn adder_gets_id_zero_and_one_timed_operation() {
    let mut device = load_device(DEFAULT_DEVICE).unwrap();
    device.timing_report_mut().insert(
        TimingKey {
            operator: OperatorKind::Add,
            width: 32,
            signed: false,
            constant: None,
        },
        5.0,
    );
    let result = run_on(&adder(), &entry_config(&["Ns.M::Run"]), &device).unwrap();

    assert_eq!(
        result.artifact.member_ids,
        BTreeMap::from([("Ns.M::Run".to_string(), 0)])
    );
    let operations: Vec<_> = result
        .members
        .iter()
        .flat_map(|m| m.result.component.multi_cycle_operations.iter())
        .collect();
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].cycles, 1);
    assert_eq!(operations[0].result, "Ns.M::Run.add.0");
    // single-cycle operations need no multicycle path
    assert!(result.artifact.constraints.is_none());
}

#[test]
fn adder_source_declares_the_host_ports() {
    let result = run(&adder(), &entry_config(&["Ns.M::Run"])).unwrap();
    for port in ["MemberId", "Started", "Finished", "CellIndex", "DataIn", "DataOut"] {
        assert!(
            result.design.port(port).is_some(),
            "missing port {port}"
        );
    }
    assert!(result.artifact.source.contains("signal \\Ns.M::Run.Finished\\"));
}

// ---------------------------------------------------------------------------
// Pruning with a shared value type
// ---------------------------------------------------------------------------

#[test]
fn pruning_keeps_entry_points_and_invoked_helpers() {
    let tree = shared_constants();
    let device = load_device(DEFAULT_DEVICE).unwrap();
    let config = entry_config(&["Ns.M::First", "Ns.M::Second"]);
    let context = TransformationContext::new(&tree, &config, &device).unwrap();
    let program = Program::build(&context).unwrap();

    let kernel = program.tree.find_type("Ns.M").unwrap();
    let methods: Vec<&str> = kernel.methods().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, ["First", "Second", "Scale"]);
    assert!(kernel.member("Unused").is_none());

    let limits = program.tree.find_type("Ns.Limits").unwrap();
    assert!(limits.member("Low").is_some());
    assert!(limits.member("High").is_some());
    assert!(limits.member("Spare").is_none());
}

#[test]
fn pruned_program_transforms_with_both_entry_points() {
    let tree = shared_constants();
    let result = run(&tree, &entry_config(&["Ns.M::First", "Ns.M::Second"])).unwrap();
    assert_eq!(result.artifact.member_id("Ns.M::First"), Some(0));
    assert_eq!(result.artifact.member_id("Ns.M::Second"), Some(1));
    assert_eq!(result.artifact.member_id("Ns.M::Scale"), None);
    assert!(result.design.process("Ns.M::Scale").is_some());
    assert!(result.design.process("Ns.M::Unused").is_none());
}

#[test]
fn pruning_matches_the_standalone_pass() {
    let tree = shared_constants();
    let entries = vec!["Ns.M::First".to_string(), "Ns.M::Second".to_string()];
    let pruned = prune(&tree, &entries).unwrap();
    let names: Vec<&str> = pruned.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Ns.Limits", "Ns.M"]);
}

// ---------------------------------------------------------------------------
// Fan-out of degree 4
// ---------------------------------------------------------------------------

#[test]
fn fan_out_builds_four_replicas_and_one_join() {
    let config = entry_config(&["Ns.K::Run"]).with_parallelism("Ns.K::Worker", 4);
    let result = run(&fan_out(4), &config).unwrap();

    for i in 0..4 {
        let name = format!("Ns.K::Worker.{i}");
        let replica = component(&result, &name).unwrap();
        assert_eq!(replica.index, i);
        assert!(result.design.process(&name).is_some(), "missing {name}");
        let parameter = forwarded_parameter_out("Ns.K::Run", "Ns.K::Worker", "x", i);
        assert!(result.design.signal(&parameter).is_some(), "missing {parameter}");
    }
    assert!(component(&result, "Ns.K::Worker.4").is_none());
    assert!(component(&result, "Ns.K::Worker").is_none());

    let finished: Vec<String> = (0..4)
        .map(|i| invocation_finished("Ns.K::Run", "Ns.K::Worker", i))
        .collect();
    let run_component = &component(&result, "Ns.K::Run").unwrap().result.component;
    let joins = run_component
        .states
        .iter()
        .filter(|s| has_branch_on(&s.body, &finished))
        .count();
    assert_eq!(joins, 1);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn conflicting_array_lengths_name_the_holder() {
    let config = entry_config(&["Ns.M::First", "Ns.M::Second"]);
    let err = run(&conflicting_lengths(), &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
    assert!(err.to_string().contains("Ns.M::Sum.values"), "{err}");
}

#[test]
fn missing_timing_entry_is_a_configuration_error() {
    let mut device = load_device(DEFAULT_DEVICE).unwrap();
    device.timing_report_mut().remove(&TimingKey {
        operator: OperatorKind::Mul,
        width: 64,
        signed: true,
        constant: None,
    });
    let err = run_on(&wide_signed_multiply(), &entry_config(&["Ns.M::Run"]), &device)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("64-bit signed"), "{err}");
}

#[test]
fn unmatched_selectors_fail_the_run() {
    let err = run(&adder(), &entry_config(&["Ns.M::Missing"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
