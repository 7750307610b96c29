//! Suitability checks run on the pruned tree before any lowering.
//!
//! Each check rejects one family of constructs the hardware model cannot
//! express. The first violation aborts the run.

use crate::call_graph::CallGraph;
use crate::const_fold::fold_expr;
use crate::error::TransformError;
use crate::parallel::{recognize_fan_out, FanOut};
use crate::typing::{is_reference_type, storage_of, Scope};
use foundry_ast::decl::split_member_name;
use foundry_ast::visit::{walk_expr, walk_stmt, Visitor};
use foundry_ast::{
    member_full_name, BinaryOp, Expr, Literal, Member, Stmt, SyntaxTree, TypeRef,
};
use foundry_config::TransformerConfig;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use std::collections::BTreeMap;
use tracing::debug;

/// Runs every check.
pub fn verify(
    tree: &SyntaxTree,
    entry_points: &[String],
    call_graph: &CallGraph,
    config: &TransformerConfig,
) -> Result<(), TransformError> {
    check_entry_types(tree, entry_points)?;
    check_static_state(tree)?;
    check_type_shapes(tree)?;
    check_object_graph(tree)?;
    check_bodies(tree, config)?;
    check_recursion(call_graph)?;
    debug!(types = tree.types.len(), "verified");
    Ok(())
}

/// Entry-point types hold no per-instance state: only constant fields and
/// read-only properties, and no constructors.
pub fn check_entry_types(tree: &SyntaxTree, entry_points: &[String]) -> Result<(), TransformError> {
    let mut types: Vec<&str> = entry_points
        .iter()
        .filter_map(|e| split_member_name(e).map(|(t, _)| t))
        .collect();
    types.sort_unstable();
    types.dedup();
    for name in types {
        let Some(ty) = tree.find_type(name) else {
            continue;
        };
        for member in &ty.members {
            let construct = match member {
                Member::Field(f) if !f.is_const => format!("mutable field `{}`", f.name),
                Member::Property(p) if p.has_setter => format!("settable property `{}`", p.name),
                Member::Method(m) if m.is_constructor() => "constructor".to_string(),
                _ => continue,
            };
            return Err(TransformError::unsupported(
                format!("{construct} in an entry-point type"),
                name,
            ));
        }
    }
    Ok(())
}

/// No mutable static fields or properties anywhere.
pub fn check_static_state(tree: &SyntaxTree) -> Result<(), TransformError> {
    for ty in &tree.types {
        for member in &ty.members {
            let name = match member {
                Member::Field(f) if f.is_static && !f.is_const => &f.name,
                Member::Property(p) if p.is_static && p.has_setter => &p.name,
                _ => continue,
            };
            return Err(TransformError::unsupported(
                format!("static mutable field `{name}`"),
                &ty.name,
            ));
        }
    }
    Ok(())
}

fn check_type_ref(ty: &TypeRef, declaration: &str) -> Result<(), TransformError> {
    match ty {
        TypeRef::Array { element, rank } => {
            if *rank > 1 {
                return Err(TransformError::unsupported(
                    format!("multi-dimensional array `{ty}`"),
                    declaration,
                ));
            }
            if element.is_array() {
                return Err(TransformError::unsupported(
                    format!("array of arrays `{ty}`"),
                    declaration,
                ));
            }
            check_type_ref(element, declaration)
        }
        TypeRef::Task(inner) => check_type_ref(inner, declaration),
        _ => Ok(()),
    }
}

/// Only one-dimensional arrays of scalars or records.
pub fn check_type_shapes(tree: &SyntaxTree) -> Result<(), TransformError> {
    struct Locals<'d> {
        declaration: &'d str,
        error: Option<TransformError>,
    }
    impl Visitor for Locals<'_> {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            if let Stmt::Local { ty, .. } = stmt {
                if let Err(err) = check_type_ref(ty, self.declaration) {
                    self.error.get_or_insert(err);
                }
            }
            walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, expr: &Expr) {
            if let Expr::NewArray { element, .. } = expr {
                if let Err(err) = check_type_ref(&TypeRef::array(element.clone()), self.declaration) {
                    self.error.get_or_insert(err);
                }
            }
            walk_expr(self, expr);
        }
    }

    for ty in &tree.types {
        for member in &ty.members {
            let declaration = member_full_name(&ty.name, member.name());
            check_type_ref(member.value_type(), &declaration)?;
            let Member::Method(method) = member else {
                continue;
            };
            for param in &method.params {
                check_type_ref(&param.ty, &declaration)?;
            }
            if let Some(body) = &method.body {
                let mut locals = Locals {
                    declaration: &declaration,
                    error: None,
                };
                foundry_ast::walk_block(&mut locals, body);
                if let Some(err) = locals.error {
                    return Err(err);
                }
            }
        }
    }
    Ok(())
}

/// No type may reach itself through its instance storage.
pub fn check_object_graph(tree: &SyntaxTree) -> Result<(), TransformError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let nodes: BTreeMap<&str, _> = tree
        .types
        .iter()
        .map(|t| (t.name.as_str(), graph.add_node(t.name.as_str())))
        .collect();
    for ty in &tree.types {
        for slot in storage_of(tree, &ty.name) {
            let mut referenced = Vec::new();
            slot.ty.named_types(&mut referenced);
            for target in referenced {
                if let Some(&to) = nodes.get(target.as_str()) {
                    graph.update_edge(nodes[ty.name.as_str()], to, ());
                }
            }
        }
    }
    let mut cycles: Vec<Vec<&str>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.find_edge(scc[0], scc[0]).is_some())
        .map(|scc| {
            let mut names: Vec<&str> = scc.into_iter().map(|n| graph[n]).collect();
            names.sort_unstable();
            names
        })
        .collect();
    cycles.sort();
    match cycles.first() {
        Some(cycle) => Err(TransformError::unsupported(
            format!("self-referencing object graph through `{}`", cycle.join("`, `")),
            cycle[0],
        )),
        None => Ok(()),
    }
}

/// A storage location fixed at compile time: a local, `this` or a static
/// field, followed by field accesses and constant array indices.
fn is_fixed_place(expr: &Expr) -> bool {
    match expr {
        Expr::Local(_) | Expr::This | Expr::StaticField { .. } => true,
        Expr::Field { target, .. } => is_fixed_place(target),
        Expr::ArrayElement { array, index } => {
            index.as_int_literal().is_some() && is_fixed_place(array)
        }
        _ => false,
    }
}

struct BodyCheck<'a> {
    scope: Scope<'a>,
    config: &'a TransformerConfig,
    error: Option<TransformError>,
}

impl BodyCheck<'_> {
    fn fail(&mut self, construct: String) {
        if self.error.is_none() {
            self.error = Some(TransformError::unsupported(construct, self.scope.member()));
        }
    }

    fn check_task_target(&mut self, method: &str) {
        let tree = self.scope.tree();
        match tree.find_method(method) {
            Some((_, m)) if !m.is_instance() && m.params.len() == 1 && m.body.is_some() => {}
            _ => self.fail(format!(
                "task started on `{method}`, which is not a static method with one parameter"
            )),
        }
    }

    /// Reference-typed task arguments are copied back, so every replica must
    /// receive a distinct fixed location.
    fn check_partition(&mut self, fan_out: &FanOut) {
        let degree = match fan_out.degree(self.config, self.scope.member()) {
            Ok(degree) => degree,
            Err(err) => {
                self.error.get_or_insert(err);
                return;
            }
        };
        let mut places: Vec<Expr> = Vec::new();
        for index in 0..degree {
            let place = fold_expr(self.scope.tree(), &fan_out.argument_for(index));
            if !is_fixed_place(&place) || places.contains(&place) {
                self.fail(format!(
                    "replicas of `{}` may share mutable state passed as the task argument",
                    fan_out.callee
                ));
                return;
            }
            places.push(place);
        }
    }
}

impl Visitor for BodyCheck<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Some(fan_out) = recognize_fan_out(stmt) {
            self.check_task_target(&fan_out.callee);
            match self.scope.type_of(&fan_out.argument) {
                Ok(ty) if is_reference_type(self.scope.tree(), &ty) => {
                    self.check_partition(&fan_out)
                }
                Ok(_) => {}
                Err(err) => {
                    self.error.get_or_insert(err);
                }
            }
            // The task argument is still an ordinary expression.
            self.visit_expr(&fan_out.argument);
            return;
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::StartTask { .. } => {
                self.fail("task started outside a statically bounded fan-out loop".to_string())
            }
            Expr::Binary {
                op: BinaryOp::Eq | BinaryOp::Ne,
                lhs,
                rhs,
            } => {
                let other = match (lhs.as_ref(), rhs.as_ref()) {
                    (Expr::Literal(Literal::Null), other) | (other, Expr::Literal(Literal::Null)) => {
                        Some(other)
                    }
                    _ => None,
                };
                if let Some(other) = other {
                    if matches!(self.scope.type_of(other), Ok(TypeRef::Array { .. })) {
                        self.fail("null comparison against an array".to_string());
                    }
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Per-body constructs: fan-out shape and aliasing, stray task starts and
/// null checks on arrays.
pub fn check_bodies(tree: &SyntaxTree, config: &TransformerConfig) -> Result<(), TransformError> {
    for (owner, method) in tree.methods() {
        let Some(body) = &method.body else {
            continue;
        };
        let mut check = BodyCheck {
            scope: Scope::new(tree, owner, method),
            config,
            error: None,
        };
        foundry_ast::walk_block(&mut check, body);
        if let Some(err) = check.error {
            return Err(err);
        }
    }
    Ok(())
}

/// Hardware has no call stack.
pub fn check_recursion(call_graph: &CallGraph) -> Result<(), TransformError> {
    match call_graph.find_recursion() {
        Some(members) => Err(TransformError::unsupported(
            format!("recursion through `{}`", members.join("`, `")),
            &members[0],
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchTable;
    use crate::error::ErrorKind;
    use crate::parallel::tests::fan_out_loop;
    use foundry_ast::build::*;

    fn kernel(body: Vec<Stmt>) -> SyntaxTree {
        SyntaxTree::new(vec![class("Ns.K")
            .method(public_static(
                "Run",
                vec![param("data", array_ty(u32_ty()))],
                void(),
                body,
            ))
            .method(private_static(
                "Worker",
                vec![param("slice", array_ty(u32_ty()))],
                u32_ty(),
                vec![ret(index(local("slice"), i32_lit(0)))],
            ))
            .build()])
    }

    fn config() -> TransformerConfig {
        TransformerConfig::new("Nexys A7-100T")
    }

    /// `Ns.K::Run` fanning out over an array of `Ns.P` objects.
    fn record_kernel(argument: Expr) -> SyntaxTree {
        SyntaxTree::new(vec![
            class("Ns.P").field("v", u32_ty()).build(),
            class("Ns.K")
                .method(public_static(
                    "Run",
                    vec![param("data", array_ty(named("Ns.P")))],
                    void(),
                    vec![
                        declare(
                            "tasks",
                            array_ty(task_ty(u32_ty())),
                            Some(new_array(task_ty(u32_ty()), i32_lit(4))),
                        ),
                        fan_out_loop(i32_lit(4), argument),
                    ],
                ))
                .method(private_static(
                    "Worker",
                    vec![param("p", named("Ns.P"))],
                    u32_ty(),
                    vec![ret(field(local("p"), "Ns.P", "v"))],
                ))
                .build(),
        ])
    }

    fn unsupported(result: Result<(), TransformError>, needle: &str) {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[test]
    fn entry_types_must_be_stateless() {
        let tree = SyntaxTree::new(vec![class("Ns.K")
            .const_field("Size", u32_ty(), u32_lit(4))
            .field("count", u32_ty())
            .method(public_static("Run", vec![], void(), vec![]))
            .build()]);
        unsupported(
            check_entry_types(&tree, &["Ns.K::Run".to_string()]),
            "mutable field `count`",
        );
    }

    #[test]
    fn static_mutable_fields_are_rejected() {
        let tree = SyntaxTree::new(vec![class("Ns.Counter")
            .static_field("Count", u32_ty())
            .build()]);
        unsupported(check_static_state(&tree), "static mutable field `Count`");
    }

    #[test]
    fn jagged_and_multi_dimensional_arrays_are_rejected() {
        let tree = kernel(vec![declare(
            "grid",
            array_ty(array_ty(u32_ty())),
            None,
        )]);
        unsupported(check_type_shapes(&tree), "array of arrays");

        let tree = kernel(vec![declare(
            "grid",
            TypeRef::Array {
                element: Box::new(u32_ty()),
                rank: 2,
            },
            None,
        )]);
        unsupported(check_type_shapes(&tree), "multi-dimensional");
    }

    #[test]
    fn self_referencing_types_are_rejected() {
        let tree = SyntaxTree::new(vec![
            class("Ns.Node").field("next", named("Ns.Node")).build(),
            class("Ns.Leaf").field("value", u32_ty()).build(),
        ]);
        unsupported(check_object_graph(&tree), "`Ns.Node`");

        let tree = SyntaxTree::new(vec![
            class("Ns.A").field("b", array_ty(named("Ns.B"))).build(),
            class("Ns.B").field("a", named("Ns.A")).build(),
        ]);
        unsupported(check_object_graph(&tree), "`Ns.A`, `Ns.B`");
    }

    #[test]
    fn arrays_cannot_be_null() {
        let tree = kernel(vec![if_else(eq(local("data"), null()), vec![ret_void()], None)]);
        unsupported(check_bodies(&tree, &config()), "null comparison against an array");
    }

    #[test]
    fn replicas_must_not_share_arrays() {
        let tree = kernel(vec![
            declare("tasks", array_ty(task_ty(u32_ty())), Some(new_array(task_ty(u32_ty()), i32_lit(4)))),
            fan_out_loop(i32_lit(4), local("data")),
        ]);
        unsupported(check_bodies(&tree, &config()), "share mutable state");
    }

    #[test]
    fn replicas_need_pairwise_distinct_elements() {
        let disjoint = record_kernel(index(local("data"), local("i")));
        check_bodies(&disjoint, &config()).unwrap();

        let folded = record_kernel(index(local("data"), add(local("i"), i32_lit(1))));
        check_bodies(&folded, &config()).unwrap();

        let wrapped = record_kernel(index(local("data"), rem(local("i"), i32_lit(2))));
        unsupported(check_bodies(&wrapped, &config()), "share mutable state");

        let dynamic = record_kernel(index(local("data"), local("offset")));
        unsupported(check_bodies(&dynamic, &config()), "share mutable state");
    }

    #[test]
    fn stray_task_starts_are_rejected() {
        let tree = kernel(vec![declare(
            "t",
            task_ty(u32_ty()),
            Some(start_task("Ns.K::Worker", local("data"))),
        )]);
        unsupported(check_bodies(&tree, &config()), "outside a statically bounded fan-out");
    }

    #[test]
    fn recursion_is_rejected() {
        let tree = SyntaxTree::new(vec![class("Ns.K")
            .method(public_static(
                "Run",
                vec![],
                void(),
                vec![expr_stmt(call_static("Ns.K::Run", vec![]))],
            ))
            .build()]);
        let graph = CallGraph::build(&tree, &DispatchTable::build(&tree)).unwrap();
        unsupported(check_recursion(&graph), "recursion through `Ns.K::Run`");
    }
}
