//! Static array lengths.
//!
//! Every array in hardware has a fixed length, recorded per *holder*: the
//! local, parameter, field or return value that carries the array. Lengths
//! come from configuration overrides and from `new T[n]` with a constant
//! `n`, and flow along assignments, arguments and return values until
//! nothing changes.

use crate::dispatch::DispatchTable;
use crate::error::TransformError;
use crate::typing::{field_holder, local_holder, return_holder, Scope};
use foundry_ast::decl::CONSTRUCTOR_NAME;
use foundry_ast::visit::{walk_expr, walk_stmt, Visitor};
use foundry_ast::{member_full_name, Expr, Member, Stmt, SyntaxTree, TypeRef};
use std::collections::BTreeMap;

/// Holder name to array length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArraySizeTable {
    sizes: BTreeMap<String, u32>,
}

impl ArraySizeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the length of a holder.
    ///
    /// Recording the same length twice is a no-op; a different length is an
    /// unsupported construct naming the holder.
    pub fn set_size(&mut self, holder: &str, length: u32) -> Result<(), TransformError> {
        match self.sizes.get(holder) {
            Some(&existing) if existing != length => Err(TransformError::unsupported(
                format!("conflicting array lengths {existing} and {length} for `{holder}`"),
                holder,
            )),
            Some(_) => Ok(()),
            None => {
                self.sizes.insert(holder.to_string(), length);
                Ok(())
            }
        }
    }

    /// The length of a holder, if known.
    pub fn get(&self, holder: &str) -> Option<u32> {
        self.sizes.get(holder).copied()
    }

    /// The length of a holder, which lowering cannot proceed without.
    pub fn require(&self, holder: &str, declaration: &str) -> Result<u32, TransformError> {
        self.get(holder).ok_or_else(|| {
            TransformError::unsupported(
                format!("unresolved array length for `{holder}`"),
                declaration,
            )
        })
    }

    /// Number of holders with a known length.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Returns `true` if no length is known.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Iterates over `(holder, length)` in holder order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.sizes.iter().map(|(h, l)| (h.as_str(), *l))
    }

    /// Infers the length of every array holder in the tree.
    ///
    /// Overrides are recorded first; inferred lengths that disagree with an
    /// override are still conflicts.
    pub fn infer(
        tree: &SyntaxTree,
        overrides: &BTreeMap<String, u32>,
        dispatch: &DispatchTable,
    ) -> Result<Self, TransformError> {
        let mut table = Self::new();
        for (holder, length) in overrides {
            table.set_size(holder, *length)?;
        }

        let mut flows = Flows::default();
        for ty in &tree.types {
            for member in &ty.members {
                if let Member::Field(field) = member {
                    if let Some(init) = &field.initializer {
                        let holder = field_holder(&ty.name, &field.name);
                        flows.literal(init, &holder, &ty.name)?;
                    }
                }
            }
        }
        for (owner, method) in tree.methods() {
            let Some(body) = &method.body else {
                continue;
            };
            let mut collector = Collector {
                scope: Scope::new(tree, owner, method),
                dispatch,
                returns_array: method.return_type.is_array(),
                flows: &mut flows,
                error: None,
            };
            foundry_ast::walk_block(&mut collector, body);
            if let Some(err) = collector.error {
                return Err(err);
            }
        }

        for (holder, length) in &flows.facts {
            table.set_size(holder, *length)?;
        }
        loop {
            let mut changed = false;
            for (from, to) in &flows.links {
                match (table.get(from), table.get(to)) {
                    (Some(length), None) => {
                        table.set_size(to, length)?;
                        changed = true;
                    }
                    (None, Some(length)) => {
                        table.set_size(from, length)?;
                        changed = true;
                    }
                    (Some(length), Some(_)) => table.set_size(to, length)?,
                    (None, None) => {}
                }
            }
            if !changed {
                break;
            }
        }
        Ok(table)
    }
}

#[derive(Debug, Default)]
struct Flows {
    facts: Vec<(String, u32)>,
    links: Vec<(String, String)>,
}

impl Flows {
    /// Records `new T[n]` flowing into `holder`; returns `false` if `value`
    /// is not an array creation.
    fn literal(&mut self, value: &Expr, holder: &str, declaration: &str) -> Result<bool, TransformError> {
        let Expr::NewArray { element, length } = value else {
            return Ok(false);
        };
        if matches!(element, TypeRef::Task(_)) {
            return Ok(true);
        }
        let Some((n, _)) = length.as_int_literal() else {
            return Err(dynamic_array(declaration));
        };
        let n = u32::try_from(n).ok().filter(|n| *n > 0).ok_or_else(|| {
            TransformError::unsupported(format!("array of length {n}"), declaration)
        })?;
        self.facts.push((holder.to_string(), n));
        Ok(true)
    }
}

fn dynamic_array(declaration: &str) -> TransformError {
    TransformError::unsupported("dynamically-sized array", declaration)
}

fn is_task_array(ty: &TypeRef) -> bool {
    matches!(ty.element(), Some(TypeRef::Task(_)))
}

struct Collector<'a, 'f> {
    scope: Scope<'a>,
    dispatch: &'a DispatchTable,
    returns_array: bool,
    flows: &'f mut Flows,
    error: Option<TransformError>,
}

impl Collector<'_, '_> {
    fn flow(&mut self, value: &Expr, holder: String) {
        if self.error.is_some() {
            return;
        }
        match value {
            Expr::Conditional {
                then, otherwise, ..
            } => {
                self.flow(then, holder.clone());
                self.flow(otherwise, holder);
            }
            _ => match self.flows.literal(value, &holder, self.scope.member()) {
                Ok(true) => {}
                Ok(false) => {
                    if let Some(source) = self.scope.holder_of(value) {
                        self.flows.links.push((source, holder));
                    }
                }
                Err(err) => self.error = Some(err),
            },
        }
    }

    fn arguments(&mut self, targets: Vec<String>, args: &[Expr]) {
        let tree = self.scope.tree();
        for target in targets {
            let Some((_, method)) = tree.find_method(&target) else {
                continue;
            };
            for (arg, param) in args.iter().zip(&method.params) {
                if param.ty.is_array() && !is_task_array(&param.ty) {
                    self.flow(arg, local_holder(&target, &param.name));
                }
            }
        }
    }
}

impl Visitor for Collector<'_, '_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local {
                name,
                ty,
                init: Some(init),
            } if ty.is_array() && !is_task_array(ty) => {
                let holder = local_holder(self.scope.member(), name);
                self.flow(init, holder);
            }
            Stmt::Assign { target, value } => {
                let is_array = self
                    .scope
                    .type_of(target)
                    .map(|t| t.is_array() && !is_task_array(&t))
                    .unwrap_or(false);
                if is_array {
                    if let Some(holder) = self.scope.holder_of(target) {
                        self.flow(value, holder);
                    }
                }
            }
            Stmt::Return(Some(value)) if self.returns_array => {
                let holder = return_holder(self.scope.member());
                self.flow(value, holder);
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call { method, args, .. } => {
                let mut targets = vec![method.clone()];
                targets.extend(
                    self.dispatch
                        .implementations(method)
                        .iter()
                        .map(|i| i.member.clone()),
                );
                self.arguments(targets, args);
            }
            Expr::New { type_name, args } => {
                let ctor = member_full_name(type_name, CONSTRUCTOR_NAME);
                self.arguments(vec![ctor], args);
            }
            Expr::StartTask { method, argument } => {
                self.arguments(vec![method.clone()], std::slice::from_ref(argument.as_ref()));
            }
            Expr::NewArray { element, length }
                if !matches!(element, TypeRef::Task(_)) && !length.is_literal() =>
            {
                if self.error.is_none() {
                    self.error = Some(dynamic_array(self.scope.member()));
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use foundry_ast::build::*;

    fn infer(tree: &SyntaxTree) -> Result<ArraySizeTable, TransformError> {
        ArraySizeTable::infer(tree, &BTreeMap::new(), &DispatchTable::build(tree))
    }

    fn sum_helper() -> foundry_ast::MethodDecl {
        private_static(
            "Sum",
            vec![param("values", array_ty(u32_ty()))],
            u32_ty(),
            vec![ret(index(local("values"), i32_lit(0)))],
        )
    }

    #[test]
    fn second_size_must_agree() {
        let mut table = ArraySizeTable::new();
        table.set_size("M::Run.buffer", 4).unwrap();
        table.set_size("M::Run.buffer", 4).unwrap();
        let err = table.set_size("M::Run.buffer", 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert!(err.to_string().contains("`M::Run.buffer`"));
        assert_eq!(table.get("M::Run.buffer"), Some(4));
    }

    #[test]
    fn lengths_flow_into_parameters() {
        let tree = SyntaxTree::new(vec![class("Ns.M")
            .method(public_static(
                "Run",
                vec![],
                u32_ty(),
                vec![
                    declare("data", array_ty(u32_ty()), Some(new_array(u32_ty(), i32_lit(8)))),
                    declare("copy", array_ty(u32_ty()), None),
                    assign(local("copy"), local("data")),
                    ret(call_static("Ns.M::Sum", vec![local("copy")])),
                ],
            ))
            .method(sum_helper())
            .build()]);
        let table = infer(&tree).unwrap();
        assert_eq!(table.get("Ns.M::Run.data"), Some(8));
        assert_eq!(table.get("Ns.M::Run.copy"), Some(8));
        assert_eq!(table.get("Ns.M::Sum.values"), Some(8));
    }

    #[test]
    fn differing_call_sites_conflict() {
        let caller = |name: &str, length: i32| {
            public_static(
                name,
                vec![],
                u32_ty(),
                vec![
                    declare("a", array_ty(u32_ty()), Some(new_array(u32_ty(), i32_lit(length)))),
                    ret(call_static("Ns.M::Sum", vec![local("a")])),
                ],
            )
        };
        let tree = SyntaxTree::new(vec![class("Ns.M")
            .method(caller("First", 5))
            .method(caller("Second", 6))
            .method(sum_helper())
            .build()]);
        let err = infer(&tree).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
        assert!(err.to_string().contains("Ns.M::Sum.values"), "{err}");
    }

    #[test]
    fn overrides_size_entry_point_parameters() {
        let tree = SyntaxTree::new(vec![class("Ns.M").method(sum_helper()).build()]);
        let overrides = BTreeMap::from([("Ns.M::Sum.values".to_string(), 3)]);
        let table =
            ArraySizeTable::infer(&tree, &overrides, &DispatchTable::build(&tree)).unwrap();
        assert_eq!(table.require("Ns.M::Sum.values", "Ns.M::Sum").unwrap(), 3);
        assert!(table.require("Ns.M::Sum.other", "Ns.M::Sum").is_err());
    }

    #[test]
    fn dynamic_lengths_are_rejected() {
        let tree = SyntaxTree::new(vec![class("Ns.M")
            .method(public_static(
                "Run",
                vec![param("n", i32_ty())],
                void(),
                vec![declare("a", array_ty(u32_ty()), Some(new_array(u32_ty(), local("n"))))],
            ))
            .build()]);
        let err = infer(&tree).unwrap_err();
        assert!(err.to_string().contains("dynamically-sized array"));
    }
}
