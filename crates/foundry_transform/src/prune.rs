//! Reachability pruning.
//!
//! Mark-and-sweep over declarations: starting from the entry points, follow
//! calls, task starts, object creations, field references, type references,
//! base types and overrides, then drop everything unmarked.

use crate::dispatch::{is_dispatched, overriders};
use crate::error::TransformError;
use crate::typing::find_field;
use foundry_ast::decl::{split_member_name, CONSTRUCTOR_NAME};
use foundry_ast::visit::{walk_expr, walk_stmt, Visitor};
use foundry_ast::{member_full_name, Expr, Member, Stmt, SyntaxTree, TypeDecl, TypeRef};
use std::collections::BTreeSet;
use tracing::debug;

/// The declarations reachable from the entry points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reachability {
    /// Reached type names.
    pub types: BTreeSet<String>,
    /// Reached members, by full name.
    pub members: BTreeSet<String>,
}

enum Item {
    Type(String),
    Member(String),
}

struct Marker<'t> {
    tree: &'t SyntaxTree,
    reach: Reachability,
    worklist: Vec<Item>,
}

impl<'t> Marker<'t> {
    fn mark_type(&mut self, name: &str) {
        if self.tree.find_type(name).is_some() && self.reach.types.insert(name.to_string()) {
            self.worklist.push(Item::Type(name.to_string()));
        }
    }

    fn mark_member(&mut self, full_name: &str) {
        if self.tree.find_member(full_name).is_some()
            && self.reach.members.insert(full_name.to_string())
        {
            self.worklist.push(Item::Member(full_name.to_string()));
        }
    }

    fn mark_type_ref(&mut self, ty: &TypeRef) {
        let mut names = Vec::new();
        ty.named_types(&mut names);
        for name in names {
            self.mark_type(&name);
        }
    }

    fn visit_type(&mut self, ty: &TypeDecl) {
        for parent in ty.base.iter().chain(&ty.interfaces) {
            self.mark_type(parent);
        }
    }

    fn visit_member(&mut self, full_name: &str) {
        let tree = self.tree;
        let Some((owner, member)) = tree.find_member(full_name) else {
            return;
        };
        self.mark_type(&owner.name);
        match member {
            Member::Field(field) => {
                self.mark_type_ref(&field.ty);
                if let Some(init) = &field.initializer {
                    References { marker: self }.visit_expr(init);
                }
            }
            Member::Property(property) => self.mark_type_ref(&property.ty),
            Member::Method(method) => {
                for param in &method.params {
                    self.mark_type_ref(&param.ty);
                }
                self.mark_type_ref(&method.return_type);
                if let Some(body) = &method.body {
                    let mut refs = References { marker: self };
                    foundry_ast::walk_block(&mut refs, body);
                }
                if is_dispatched(owner, method) {
                    for implementation in overriders(tree, owner, method) {
                        self.mark_member(&implementation.member);
                    }
                }
            }
        }
    }

    fn run(mut self) -> Reachability {
        let tree = self.tree;
        while let Some(item) = self.worklist.pop() {
            match item {
                Item::Type(name) => {
                    if let Some(ty) = tree.find_type(&name) {
                        self.visit_type(ty);
                    }
                }
                Item::Member(name) => self.visit_member(&name),
            }
        }
        self.reach
    }
}

struct References<'m, 't> {
    marker: &'m mut Marker<'t>,
}

impl Visitor for References<'_, '_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Local { ty, .. } = stmt {
            self.marker.mark_type_ref(ty);
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call { method, .. } | Expr::StartTask { method, .. } => {
                self.marker.mark_member(method);
            }
            Expr::New { type_name, .. } => {
                self.marker.mark_type(type_name);
                self.marker
                    .mark_member(&member_full_name(type_name, CONSTRUCTOR_NAME));
            }
            Expr::Field {
                type_name, name, ..
            }
            | Expr::StaticField { type_name, name } => {
                if let Some((owner, _)) = find_field(self.marker.tree, type_name, name) {
                    let full = member_full_name(&owner.name, name);
                    self.marker.mark_member(&full);
                }
            }
            Expr::Cast { ty, .. } => self.marker.mark_type_ref(ty),
            Expr::NewArray { element, .. } => self.marker.mark_type_ref(element),
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Marks every declaration reachable from the entry points.
pub fn mark(tree: &SyntaxTree, entry_points: &[String]) -> Reachability {
    let mut marker = Marker {
        tree,
        reach: Reachability::default(),
        worklist: Vec::new(),
    };
    for entry in entry_points {
        marker.mark_member(entry);
    }
    marker.run()
}

/// Keeps only the marked declarations, preserving declaration order.
pub fn sweep(tree: &SyntaxTree, reach: &Reachability) -> SyntaxTree {
    let types = tree
        .types
        .iter()
        .filter(|ty| reach.types.contains(&ty.name))
        .map(|ty| TypeDecl {
            members: ty
                .members
                .iter()
                .filter(|m| {
                    reach
                        .members
                        .contains(&member_full_name(&ty.name, m.name()))
                })
                .cloned()
                .collect(),
            ..ty.clone()
        })
        .collect();
    SyntaxTree::new(types)
}

/// Removes every declaration not reachable from the entry points.
pub fn prune(tree: &SyntaxTree, entry_points: &[String]) -> Result<SyntaxTree, TransformError> {
    if entry_points.is_empty() {
        return Err(TransformError::configuration(
            "no entry points resolved from the configured selectors",
        ));
    }
    for entry in entry_points {
        if split_member_name(entry).is_none() || tree.find_method(entry).is_none() {
            return Err(TransformError::configuration(format!(
                "entry point `{entry}` is not a method"
            )));
        }
    }
    let reach = mark(tree, entry_points);
    debug!(
        types = reach.types.len(),
        members = reach.members.len(),
        "marked reachable declarations"
    );
    Ok(sweep(tree, &reach))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_ast::build::*;

    fn tree() -> SyntaxTree {
        SyntaxTree::new(vec![
            interface("Ns.IOp", vec![abstract_method("Apply", vec![], u32_ty())]),
            class("Ns.Twice")
                .implements("Ns.IOp")
                .method(public_instance("Apply", vec![], u32_ty(), vec![ret(u32_lit(2))]))
                .build(),
            class("Ns.Unused")
                .method(public_static("Nothing", vec![], void(), vec![]))
                .build(),
            class("Ns.Kernel")
                .const_field("Size", u32_ty(), u32_lit(8))
                .method(public_static(
                    "Run",
                    vec![param("memory", memory_ty())],
                    void(),
                    vec![
                        declare("op", named("Ns.IOp"), Some(new_object("Ns.Twice", vec![]))),
                        expr_stmt(call_static("Ns.Kernel::Helper", vec![])),
                        expr_stmt(call_virtual(local("op"), "Ns.IOp::Apply", vec![])),
                    ],
                ))
                .method(private_static(
                    "Helper",
                    vec![],
                    u32_ty(),
                    vec![ret(static_field("Ns.Kernel", "Size"))],
                ))
                .method(private_static("Dead", vec![], void(), vec![]))
                .build(),
        ])
    }

    #[test]
    fn keeps_exactly_the_reachable_declarations() {
        let tree = tree();
        let reach = mark(&tree, &["Ns.Kernel::Run".to_string()]);
        let members: Vec<_> = reach.members.iter().map(String::as_str).collect();
        assert_eq!(
            members,
            vec![
                "Ns.IOp::Apply",
                "Ns.Kernel::Helper",
                "Ns.Kernel::Run",
                "Ns.Kernel::Size",
                "Ns.Twice::Apply",
            ]
        );
        let types: Vec<_> = reach.types.iter().map(String::as_str).collect();
        assert_eq!(types, vec!["Ns.IOp", "Ns.Kernel", "Ns.Twice"]);
    }

    #[test]
    fn sweep_preserves_order_and_drops_unmarked_members() {
        let tree = tree();
        let pruned = prune(&tree, &["Ns.Kernel::Run".to_string()]).unwrap();
        let names: Vec<_> = pruned.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Ns.IOp", "Ns.Twice", "Ns.Kernel"]);
        let kernel = pruned.find_type("Ns.Kernel").unwrap();
        assert!(kernel.member("Dead").is_none());
        assert!(kernel.member("Helper").is_some());
    }

    #[test]
    fn no_entry_points_is_a_configuration_error() {
        let err = prune(&tree(), &[]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
