//! Static resolution of virtual and interface calls.
//!
//! The program is closed: every implementation of a virtual method is in the
//! tree. The [`DispatchTable`] lists them per dispatched method so each call
//! site can be bound to one implementation at compile time.

use crate::error::TransformError;
use foundry_ast::{member_full_name, MethodDecl, SyntaxTree, TypeDecl};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One implementation of a dispatched method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// The implementing type.
    pub type_name: String,
    /// Full name of the implementing method.
    pub member: String,
}

/// Returns `true` if two methods have the same name and parameter types.
pub(crate) fn same_signature(a: &MethodDecl, b: &MethodDecl) -> bool {
    a.name == b.name
        && a.params.len() == b.params.len()
        && a.params.iter().zip(&b.params).all(|(x, y)| x.ty == y.ty)
}

/// Returns `true` if calls to the method may dispatch at run time.
pub(crate) fn is_dispatched(owner: &TypeDecl, method: &MethodDecl) -> bool {
    owner.is_interface()
        || method.modifiers.is_virtual
        || method.modifiers.is_abstract
        || method.modifiers.is_override
}

/// Every method overriding or implementing `method` of `owner`, in tree order.
pub(crate) fn overriders(
    tree: &SyntaxTree,
    owner: &TypeDecl,
    method: &MethodDecl,
) -> Vec<Implementation> {
    tree.types
        .iter()
        .filter(|ty| ty.name != owner.name && tree.is_subtype_of(&ty.name, &owner.name))
        .filter_map(|ty| {
            let candidate = ty.methods().find(|m| same_signature(m, method))?;
            let overrides = owner.is_interface() || candidate.modifiers.is_override;
            (overrides && candidate.body.is_some()).then(|| Implementation {
                type_name: ty.name.clone(),
                member: member_full_name(&ty.name, &candidate.name),
            })
        })
        .collect()
}

/// Implementations of every dispatched method, keyed by the method's full name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTable {
    entries: BTreeMap<String, Vec<Implementation>>,
}

impl DispatchTable {
    /// Builds the table for every dispatched method in the tree.
    pub fn build(tree: &SyntaxTree) -> Self {
        let mut entries = BTreeMap::new();
        for (owner, method) in tree.methods() {
            if !is_dispatched(owner, method) {
                continue;
            }
            let mut implementations = Vec::new();
            if method.body.is_some() {
                implementations.push(Implementation {
                    type_name: owner.name.clone(),
                    member: member_full_name(&owner.name, &method.name),
                });
            }
            implementations.extend(overriders(tree, owner, method));
            entries.insert(member_full_name(&owner.name, &method.name), implementations);
        }
        Self { entries }
    }

    /// The implementations of a dispatched method; empty for other methods.
    pub fn implementations(&self, method: &str) -> &[Implementation] {
        self.entries.get(method).map_or(&[], Vec::as_slice)
    }

    /// Number of dispatched methods.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no method is dispatched.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Binds a call to the method that runs.
    ///
    /// Non-virtual calls to methods with a body bind to the method itself.
    /// Virtual calls bind to the most derived implementation visible from
    /// the receiver's static type; failing that, to the only implementation.
    pub fn resolve(
        &self,
        tree: &SyntaxTree,
        method: &str,
        is_virtual: bool,
        receiver_type: Option<&str>,
        declaration: &str,
    ) -> Result<String, TransformError> {
        let has_body = tree
            .find_method(method)
            .is_some_and(|(_, m)| m.body.is_some());
        let implementations = self.implementations(method);
        if (!is_virtual || implementations.is_empty()) && has_body {
            return Ok(method.to_string());
        }

        let mut current = receiver_type.and_then(|r| tree.find_type(r));
        let mut steps = 0;
        while let Some(ty) = current {
            if let Some(found) = implementations.iter().find(|i| i.type_name == ty.name) {
                return Ok(found.member.clone());
            }
            steps += 1;
            if steps > tree.types.len() {
                break;
            }
            current = ty.base.as_deref().and_then(|b| tree.find_type(b));
        }

        match implementations {
            [only] => Ok(only.member.clone()),
            [] => Err(TransformError::unsupported(
                format!("call to `{method}`, which has no implementation"),
                declaration,
            )),
            many => Err(TransformError::unsupported(
                format!(
                    "virtual call to `{method}` on `{}` with {} possible implementations",
                    receiver_type.unwrap_or("?"),
                    many.len()
                ),
                declaration,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_ast::build::*;

    fn tree() -> SyntaxTree {
        SyntaxTree::new(vec![
            interface("Ns.IShape", vec![abstract_method("Area", vec![], u32_ty())]),
            class("Ns.Square")
                .implements("Ns.IShape")
                .method(virtual_method("Area", vec![], u32_ty(), vec![ret(u32_lit(4))]))
                .build(),
            class("Ns.BigSquare")
                .base("Ns.Square")
                .method(override_method("Area", vec![], u32_ty(), vec![ret(u32_lit(9))]))
                .build(),
            class("Ns.Circle")
                .implements("Ns.IShape")
                .method(public_instance("Area", vec![], u32_ty(), vec![ret(u32_lit(3))]))
                .build(),
        ])
    }

    #[test]
    fn lists_interface_implementations_and_overrides() {
        let table = DispatchTable::build(&tree());
        let members: Vec<_> = table
            .implementations("Ns.IShape::Area")
            .iter()
            .map(|i| i.member.as_str())
            .collect();
        assert_eq!(
            members,
            vec!["Ns.Square::Area", "Ns.BigSquare::Area", "Ns.Circle::Area"]
        );
        assert_eq!(table.implementations("Ns.Square::Area").len(), 2);
    }

    #[test]
    fn concrete_receivers_bind_to_the_most_derived_visible_implementation() {
        let tree = tree();
        let table = DispatchTable::build(&tree);
        let bound = table
            .resolve(&tree, "Ns.Square::Area", true, Some("Ns.BigSquare"), "Ns.M::Run")
            .unwrap();
        assert_eq!(bound, "Ns.BigSquare::Area");
        let bound = table
            .resolve(&tree, "Ns.IShape::Area", true, Some("Ns.Circle"), "Ns.M::Run")
            .unwrap();
        assert_eq!(bound, "Ns.Circle::Area");
    }

    #[test]
    fn non_virtual_calls_bind_to_the_named_method() {
        let tree = tree();
        let table = DispatchTable::build(&tree);
        let bound = table
            .resolve(&tree, "Ns.Square::Area", false, Some("Ns.BigSquare"), "Ns.M::Run")
            .unwrap();
        assert_eq!(bound, "Ns.Square::Area");
    }

    #[test]
    fn ambiguous_interface_calls_are_unsupported() {
        let tree = tree();
        let table = DispatchTable::build(&tree);
        let err = table
            .resolve(&tree, "Ns.IShape::Area", true, Some("Ns.IShape"), "Ns.M::Run")
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedConstruct);
        assert!(err.to_string().contains("3 possible implementations"));
    }
}
