//! The inputs of one transformation run and the analyses derived from them.

use crate::array_size::ArraySizeTable;
use crate::call_graph::CallGraph;
use crate::codes::warning_unmatched_selector;
use crate::const_fold::fold_tree;
use crate::dispatch::DispatchTable;
use crate::error::TransformError;
use crate::member::{build_interfaces, MemberInterface};
use crate::parallel::ReplicationPlan;
use crate::prune::prune;
use crate::verify::verify;
use foundry_ast::{member_full_name, SyntaxTree, Visibility};
use foundry_common::{ContentHash, ContentHasher, Frequency};
use foundry_config::TransformerConfig;
use foundry_device::DeviceDriver;
use foundry_diagnostics::Diagnostic;
use foundry_timing::OperationTimer;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Version of the generated output format. Part of every context Id, so
/// bumping it invalidates cached artifacts.
pub const FORMAT_VERSION: u32 = 1;

/// Everything a transformation run depends on: the code, the selected entry
/// points, the configuration and the device.
///
/// Creating a context is cheap. It resolves entry points and computes the
/// [`id`](Self::id) without analysing the program, so a cache can be
/// consulted before any compilation work happens.
#[derive(Debug)]
pub struct TransformationContext<'a> {
    tree: &'a SyntaxTree,
    config: &'a TransformerConfig,
    device: &'a dyn DeviceDriver,
    entry_points: Vec<String>,
    warnings: Vec<Diagnostic>,
    id: ContentHash,
}

impl<'a> TransformationContext<'a> {
    /// Validates the configuration and resolves entry points.
    ///
    /// Every public, non-constructor method with a body that matches a
    /// selector is an entry point. Selectors matching nothing produce a W303
    /// warning; if no selector matches, the run fails.
    pub fn new(
        tree: &'a SyntaxTree,
        config: &'a TransformerConfig,
        device: &'a dyn DeviceDriver,
    ) -> Result<Self, TransformError> {
        config.validate()?;
        if config.device != device.name() {
            debug!(
                configured = %config.device,
                device = %device.name(),
                "device driver differs from configured device"
            );
        }

        let candidates: Vec<String> = tree
            .methods()
            .filter(|(_, m)| {
                m.visibility == Visibility::Public && !m.is_constructor() && m.body.is_some()
            })
            .map(|(owner, m)| member_full_name(&owner.name, &m.name))
            .collect();
        let mut entry_points = Vec::new();
        let mut warnings = Vec::new();
        for selector in &config.entry_points {
            let mut matched = false;
            for name in candidates.iter().filter(|name| selector.matches(name)) {
                matched = true;
                if !entry_points.contains(name) {
                    entry_points.push(name.clone());
                }
            }
            if !matched {
                warnings.push(warning_unmatched_selector(&selector.to_string()));
            }
        }
        entry_points.sort();
        if entry_points.is_empty() {
            return Err(TransformError::configuration(
                "no entry points resolved from the configured selectors",
            ));
        }

        let id = context_id(tree, config, device)?;
        info!(entry_points = entry_points.len(), %id, "transformation context created");
        Ok(Self {
            tree,
            config,
            device,
            entry_points,
            warnings,
            id,
        })
    }

    /// The cache key of this run.
    pub fn id(&self) -> ContentHash {
        self.id
    }

    /// The full syntax tree, before pruning.
    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    /// The generation configuration.
    pub fn config(&self) -> &'a TransformerConfig {
        self.config
    }

    /// The target device.
    pub fn device(&self) -> &'a dyn DeviceDriver {
        self.device
    }

    /// The device clock.
    pub fn clock(&self) -> Frequency {
        self.device.manifest().clock_frequency
    }

    /// A timer for the device's operator latencies.
    pub fn timer(&self) -> OperationTimer<'a> {
        OperationTimer::new(self.device.timing_report(), self.clock())
    }

    /// Resolved entry points, sorted by full name.
    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    /// Warnings found while resolving entry points.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}

fn encode<T: Serialize>(label: &str, value: &T) -> Result<Vec<u8>, TransformError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|err| TransformError::internal(format!("cannot encode {label}: {err}")))
}

fn context_id(
    tree: &SyntaxTree,
    config: &TransformerConfig,
    device: &dyn DeviceDriver,
) -> Result<ContentHash, TransformError> {
    let mut hasher = ContentHasher::new();
    hasher
        .part("tree", &encode("syntax tree", tree)?)
        .part("selectors", &encode("selectors", &config.entry_points)?)
        .part("config", &encode("configuration", config)?)
        .part("device", device.name().as_bytes())
        .part(
            "clock",
            &device.manifest().clock_frequency.hz().to_le_bytes(),
        )
        .part("timing", &encode("timing report", device.timing_report())?)
        .part("format", &FORMAT_VERSION.to_le_bytes());
    Ok(hasher.finish())
}

/// The pruned, folded and verified program with its analysis tables.
///
/// Built once per run and shared read-only by every member transformation.
#[derive(Debug)]
pub struct Program {
    /// The pruned and constant-folded tree.
    pub tree: SyntaxTree,
    /// Resolved entry points, sorted.
    pub entry_points: Vec<String>,
    /// Implementations of every reached virtual method.
    pub dispatch: DispatchTable,
    /// Caller to callee edges.
    pub call_graph: CallGraph,
    /// Static lengths of every array holder.
    pub arrays: ArraySizeTable,
    /// Instances per member.
    pub replication: ReplicationPlan,
    /// Hardware interface of every member with a body, by full name.
    pub interfaces: BTreeMap<String, MemberInterface>,
}

impl Program {
    /// Runs the analysis passes: prune, fold, dispatch, call graph,
    /// verification, array sizes and replication.
    pub fn build(context: &TransformationContext<'_>) -> Result<Self, TransformError> {
        let pruned = prune(context.tree(), context.entry_points())?;
        let tree = fold_tree(&pruned);
        info!(
            types = tree.types.len(),
            methods = tree.methods().count(),
            "pruned"
        );

        let dispatch = DispatchTable::build(&tree);
        let call_graph = CallGraph::build(&tree, &dispatch)?;
        verify(&tree, context.entry_points(), &call_graph, context.config())?;
        info!(edges = call_graph.len(), "verified");

        let config = context.config();
        let arrays = ArraySizeTable::infer(&tree, &config.array_lengths, &dispatch)?;
        let replication = ReplicationPlan::build(&tree, config)?;
        let interfaces = build_interfaces(&tree, &arrays, &replication)?;
        debug!(
            arrays = arrays.len(),
            members = interfaces.len(),
            "interfaces built"
        );

        Ok(Self {
            tree,
            entry_points: context.entry_points().to_vec(),
            dispatch,
            call_graph,
            arrays,
            replication,
            interfaces,
        })
    }

    /// The interface of a member.
    pub fn interface(&self, member: &str) -> Result<&MemberInterface, TransformError> {
        self.interfaces
            .get(member)
            .ok_or_else(|| TransformError::internal(format!("no interface for `{member}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use foundry_ast::build::*;
    use foundry_device::load_device;

    fn tree() -> SyntaxTree {
        SyntaxTree::new(vec![class("Ns.Kernel")
            .method(public_static(
                "Run",
                vec![param("a", u32_ty()), param("b", u32_ty())],
                u32_ty(),
                vec![ret(add(local("a"), local("b")))],
            ))
            .method(private_static("Helper", vec![], void(), vec![ret_void()]))
            .build()])
    }

    #[test]
    fn resolves_public_entry_points_only() {
        let device = load_device(foundry_config::DEFAULT_DEVICE).unwrap();
        let tree = tree();
        let config = TransformerConfig::new(foundry_config::DEFAULT_DEVICE)
            .with_entry_point_prefix("Ns.Kernel::");
        let ctx = TransformationContext::new(&tree, &config, &device).unwrap();
        assert_eq!(ctx.entry_points(), ["Ns.Kernel::Run".to_string()]);
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn unmatched_selector_warns() {
        let device = load_device(foundry_config::DEFAULT_DEVICE).unwrap();
        let tree = tree();
        let config = TransformerConfig::new(foundry_config::DEFAULT_DEVICE)
            .with_entry_point("Ns.Kernel::Run")
            .with_entry_point("Ns.Kernel::Missing");
        let ctx = TransformationContext::new(&tree, &config, &device).unwrap();
        assert_eq!(ctx.warnings().len(), 1);
        assert_eq!(ctx.warnings()[0].code.to_string(), "W303");
    }

    #[test]
    fn no_entry_points_is_a_configuration_error() {
        let device = load_device(foundry_config::DEFAULT_DEVICE).unwrap();
        let tree = tree();
        let config = TransformerConfig::new(foundry_config::DEFAULT_DEVICE)
            .with_entry_point("Ns.Kernel::Helper");
        let err = TransformationContext::new(&tree, &config, &device).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn id_depends_on_configuration() {
        let device = load_device(foundry_config::DEFAULT_DEVICE).unwrap();
        let tree = tree();
        let a = TransformerConfig::new(foundry_config::DEFAULT_DEVICE)
            .with_entry_point("Ns.Kernel::Run");
        let b = a.clone().with_array_length("Ns.Kernel::Run.buffer", 4);
        let id_a = TransformationContext::new(&tree, &a, &device).unwrap().id();
        let id_a2 = TransformationContext::new(&tree, &a, &device).unwrap().id();
        let id_b = TransformationContext::new(&tree, &b, &device).unwrap().id();
        assert_eq!(id_a, id_a2);
        assert_ne!(id_a, id_b);
    }
}
