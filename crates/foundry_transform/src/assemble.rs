//! Gathers components and proxies into one design.

use crate::codes::warning_replicated_memory_access;
use crate::context::Program;
use crate::error::TransformError;
use crate::member::{MemberInterface, TransformedMember};
use crate::member_ids::MemberIdTable;
use crate::memory_proxy::memory_proxy;
use crate::naming::{
    CELL_INDEX_PORT, DATA_IN_PORT, DATA_OUT_PORT, FINISHED_PORT, MEMBER_ID_PORT,
    READS_DONE_PORT, READ_ENABLE_PORT, STARTED_PORT, WRITES_DONE_PORT, WRITE_ENABLE_PORT,
};
use crate::proxy::{collect_slots, external_proxy, internal_proxy};
use foundry_diagnostics::Diagnostic;
use foundry_ir::{DataType, Design, Port, Process, CLOCK_PORT, RESET_PORT};
use tracing::debug;

/// Name of the generated module.
pub const DESIGN_NAME: &str = "FoundryHardware";

/// The ports of the generated module: clock and reset, the entry-point
/// handshake and the memory interface.
pub fn top_ports() -> Vec<Port> {
    let word = || DataType::int(32, false);
    vec![
        Port::input(CLOCK_PORT, DataType::StdLogic),
        Port::input(RESET_PORT, DataType::StdLogic),
        Port::input(MEMBER_ID_PORT, word()),
        Port::input(STARTED_PORT, DataType::Boolean),
        Port::output(FINISHED_PORT, DataType::Boolean),
        Port::input(DATA_IN_PORT, word()),
        Port::output(DATA_OUT_PORT, word()),
        Port::output(CELL_INDEX_PORT, word()),
        Port::output(READ_ENABLE_PORT, DataType::Boolean),
        Port::output(WRITE_ENABLE_PORT, DataType::Boolean),
        Port::input(READS_DONE_PORT, DataType::Boolean),
        Port::input(WRITES_DONE_PORT, DataType::Boolean),
    ]
}

/// The assembled design and what was learned while assembling it.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The validated design.
    pub design: Design,
    /// Entry-point IDs and aliases.
    pub member_ids: MemberIdTable,
    /// Warnings raised during assembly.
    pub warnings: Vec<Diagnostic>,
}

/// Assembles transformed components with their proxies.
///
/// Component processes come first in the order given, then internal proxies
/// callees first, then the external proxy and the memory proxy.
pub fn assemble(
    program: &Program,
    members: &[TransformedMember],
) -> Result<Assembly, TransformError> {
    let member_ids = MemberIdTable::build(&program.tree, &program.entry_points);
    for entry in &program.entry_points {
        member_ids.lookup(entry)?;
    }

    let mut processes: Vec<Process> = members.iter().map(|m| m.result.body.clone()).collect();
    let slots = collect_slots(members, &program.entry_points);
    for callee in slots.keys() {
        if !program.interfaces.contains_key(callee) {
            return Err(TransformError::internal(format!(
                "`{callee}` is invoked but has no component"
            )));
        }
    }
    for member in program.call_graph.callees_first() {
        let Some(interface) = program.interfaces.get(&member) else {
            continue;
        };
        let member_slots = slots.get(&member).map(Vec::as_slice).unwrap_or_default();
        processes.push(internal_proxy(interface, member_slots));
    }

    let entries = program
        .entry_points
        .iter()
        .map(|e| program.interface(e))
        .collect::<Result<Vec<&MemberInterface>, _>>()?;
    processes.push(external_proxy(&member_ids, &entries));

    let memory_users: Vec<String> = members
        .iter()
        .filter(|m| m.uses_memory)
        .map(|m| m.component().to_string())
        .collect();
    processes.push(memory_proxy(&memory_users));

    let mut warnings = Vec::new();
    for (member, replicas) in program.replication.replicated() {
        if members.iter().any(|m| m.member == member && m.uses_memory) {
            warnings.push(warning_replicated_memory_access(member, replicas));
        }
    }

    let design = Design::assemble(DESIGN_NAME, top_ports(), processes)?;
    debug!(
        processes = design.processes.len(),
        types = design.types.len(),
        "design assembled"
    );
    Ok(Assembly {
        design,
        member_ids,
        warnings,
    })
}
