//! Timing constraints for multi-cycle operations.

use foundry_common::Frequency;
use foundry_ir::MultiCycleOperation;

/// Writes XDC constraints relaxing the paths into every operation result
/// that needs more than one clock cycle.
///
/// Each such operation gets a setup multiplier of `cycles` and a hold
/// multiplier of `cycles - 1`. Returns `None` when no operation needs more
/// than one cycle.
pub fn write_constraints(
    operations: &[MultiCycleOperation],
    clock: Frequency,
) -> Option<String> {
    let multi: Vec<&MultiCycleOperation> = operations.iter().filter(|op| op.cycles > 1).collect();
    if multi.is_empty() {
        return None;
    }
    let mut out = String::new();
    out.push_str("# Generated by Foundry. Do not edit.\n");
    out.push_str(&format!(
        "# Clock: {clock} (period {:.3} ns)\n",
        clock.period_ns()
    ));
    for op in multi {
        let cells = format!(
            "[get_cells -hierarchical -filter {{NAME =~ \"*{}*\"}}]",
            op.result
        );
        out.push_str(&format!(
            "set_multicycle_path {} -setup -to {cells}\n",
            op.cycles
        ));
        out.push_str(&format!(
            "set_multicycle_path {} -hold -to {cells}\n",
            op.cycles - 1
        ));
    }
    Some(out)
}
