//! Managed-code to hardware compiler core.
//!
//! Turns the reachable part of a syntax tree into clocked state machines,
//! wires them together with invocation and memory proxies, and renders the
//! result as one VHDL module plus multi-cycle timing constraints.
//!
//! # Usage
//!
//! ```ignore
//! let device = load_device(&config.device)?;
//! let context = TransformationContext::new(&tree, &config, &device)?;
//! let artifact = transform(&context)?;
//! ```
//!
//! Every error aborts the run; nothing partial is returned.

#![warn(missing_docs)]

pub mod array_size;
pub mod artifact;
pub mod assemble;
pub mod call_graph;
pub mod codes;
pub mod const_fold;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod member;
pub mod member_ids;
pub mod memory_proxy;
pub mod naming;
pub mod parallel;
pub mod proxy;
pub mod prune;
pub mod typing;
pub mod verify;

pub use artifact::{HardwareArtifact, LANGUAGE};
pub use assemble::{assemble, Assembly, DESIGN_NAME};
pub use context::{Program, TransformationContext, FORMAT_VERSION};
pub use error::{ErrorKind, TransformError};
pub use events::{CountingEvents, NoEvents, TransformationEvents};
pub use member::{transform_member, TransformedMember};
pub use member_ids::MemberIdTable;

use foundry_diagnostics::DiagnosticSink;
use foundry_ir::{render_vhdl, Design, MultiCycleOperation};
use foundry_timing::write_constraints;
use rayon::prelude::*;
use tracing::{info, warn};

/// A finished run with its intermediate results.
#[derive(Debug, Clone)]
pub struct Transformation {
    /// The assembled design.
    pub design: Design,
    /// Every transformed component, callees first.
    pub members: Vec<TransformedMember>,
    /// The artifact rendered from the design.
    pub artifact: HardwareArtifact,
}

/// Transforms the context's program into a hardware artifact.
pub fn transform(context: &TransformationContext<'_>) -> Result<HardwareArtifact, TransformError> {
    transform_with_events(context, &NoEvents)
}

/// Like [`transform`], reporting progress to `events`.
pub fn transform_with_events(
    context: &TransformationContext<'_>,
    events: &dyn TransformationEvents,
) -> Result<HardwareArtifact, TransformError> {
    Ok(transform_detailed(context, events)?.artifact)
}

/// Runs the whole pipeline and keeps the design and components.
///
/// Members are transformed in parallel; results, warnings and events keep
/// the stable member order regardless of scheduling.
pub fn transform_detailed(
    context: &TransformationContext<'_>,
    events: &dyn TransformationEvents,
) -> Result<Transformation, TransformError> {
    let program = Program::build(context)?;
    let config = context.config();
    let timer = context.timer();

    let work: Vec<(String, u32)> = program
        .call_graph
        .callees_first()
        .into_iter()
        .filter_map(|member| {
            let instances = program.interfaces.get(&member)?.instances;
            Some((member, instances))
        })
        .flat_map(|(member, instances)| (0..instances).map(move |i| (member.clone(), i)))
        .collect();
    let members = work
        .par_iter()
        .map(|(member, index)| transform_member(&program, config, timer, member, *index))
        .collect::<Vec<_>>()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;
    info!(components = members.len(), "transformed");
    for member in &members {
        events.member_transformed(member);
    }

    let assembly = assemble(&program, &members)?;
    info!(processes = assembly.design.processes.len(), "assembled");

    let sink = DiagnosticSink::new();
    sink.extend(context.warnings().iter().cloned());
    for member in &members {
        sink.extend(member.result.warnings.iter().cloned());
    }
    sink.extend(assembly.warnings);
    let warnings = sink.take_all();
    for diagnostic in &warnings {
        warn!(code = %diagnostic.code, "{}", diagnostic.message);
    }

    let operations: Vec<MultiCycleOperation> = members
        .iter()
        .flat_map(|m| m.result.component.multi_cycle_operations.iter().cloned())
        .collect();
    let artifact = HardwareArtifact {
        language: LANGUAGE.to_string(),
        member_ids: assembly.member_ids.to_map(),
        source: render_vhdl(&assembly.design),
        constraints: write_constraints(&operations, context.clock()),
        warnings: warnings.iter().map(|d| d.to_pair()).collect(),
    };
    events.transformation_completed(&artifact);
    info!(
        id = %context.id(),
        member_ids = artifact.member_ids.len(),
        warnings = artifact.warnings.len(),
        "transformation completed"
    );
    Ok(Transformation {
        design: assembly.design,
        members,
        artifact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_ast::build::*;
    use foundry_ast::SyntaxTree;
    use foundry_config::{TransformerConfig, DEFAULT_DEVICE};
    use foundry_device::load_device;

    fn tree() -> SyntaxTree {
        SyntaxTree::new(vec![class("Ns.K")
            .method(public_static(
                "Run",
                vec![param("memory", memory_ty())],
                void(),
                vec![
                    declare("x", u32_ty(), Some(memory_read(local("memory"), u32_lit(0)))),
                    memory_write(
                        local("memory"),
                        u32_lit(1),
                        call_static("Ns.K::Twice", vec![local("x")]),
                    ),
                ],
            ))
            .method(private_static(
                "Twice",
                vec![param("v", u32_ty())],
                u32_ty(),
                vec![ret(add(local("v"), local("v")))],
            ))
            .build()])
    }

    #[test]
    fn produces_a_complete_artifact() {
        let device = load_device(DEFAULT_DEVICE).unwrap();
        let tree = tree();
        let config = TransformerConfig::new(DEFAULT_DEVICE).with_entry_point("Ns.K::Run");
        let context = TransformationContext::new(&tree, &config, &device).unwrap();
        let events = CountingEvents::new();
        let result = transform_detailed(&context, &events).unwrap();

        assert_eq!(result.artifact.language, "VHDL");
        assert_eq!(result.artifact.member_id("Ns.K::Run"), Some(0));
        assert_eq!(result.members.len(), 2);
        assert_eq!(result.members[0].member, "Ns.K::Twice");
        assert_eq!(events.members(), 2);
        assert_eq!(events.completed(), 1);
        assert!(result.artifact.constraints.is_none());
        assert!(result.artifact.warnings.is_empty());
        for name in [
            "Ns.K::Run",
            "Ns.K::Twice",
            "Ns.K::Run.InvocationProxy",
            "Ns.K::Twice.InvocationProxy",
            "ExternalInvocationProxy",
            "SimpleMemoryProxy",
        ] {
            assert!(result.design.process(name).is_some(), "missing {name}");
        }
        assert!(result.artifact.source.contains("entity \\FoundryHardware\\ is"));
    }

    #[test]
    fn output_is_deterministic() {
        let device = load_device(DEFAULT_DEVICE).unwrap();
        let tree = tree();
        let config = TransformerConfig::new(DEFAULT_DEVICE).with_entry_point("Ns.K::Run");
        let context = TransformationContext::new(&tree, &config, &device).unwrap();
        let first = transform(&context).unwrap();
        let second = transform(&context).unwrap();
        assert_eq!(first, second);
    }
}
