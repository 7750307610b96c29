//! Static types of source expressions and their hardware representation.

use crate::array_size::ArraySizeTable;
use crate::error::TransformError;
use foundry_ast::visit::{walk_stmt, Visitor};
use foundry_ast::{
    BinaryOp, Expr, IntType, Literal, Member, MethodDecl, Stmt, SyntaxTree, TypeDecl, TypeRef,
    UnaryOp,
};
use foundry_ir::DataType;
use std::collections::HashMap;

/// Array holder of a local or parameter: `{member}.{name}`.
pub fn local_holder(member: &str, local: &str) -> String {
    format!("{member}.{local}")
}

/// Array holder of a field: `{Type}.{field}`.
pub fn field_holder(type_name: &str, field: &str) -> String {
    format!("{type_name}.{field}")
}

/// Array holder of a member's return value.
pub fn return_holder(member: &str) -> String {
    format!("{member}.return")
}

/// One instance field of an object layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSlot {
    /// The type declaring the field.
    pub declaring_type: String,
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeRef,
}

/// The instance storage of a type, base class fields first. Constant fields
/// take no storage.
pub fn storage_of(tree: &SyntaxTree, type_name: &str) -> Vec<StorageSlot> {
    let mut chain = Vec::new();
    let mut current = tree.find_type(type_name);
    while let Some(ty) = current {
        if chain.iter().any(|t: &&TypeDecl| t.name == ty.name) {
            break;
        }
        chain.push(ty);
        current = ty.base.as_deref().and_then(|b| tree.find_type(b));
    }
    chain
        .iter()
        .rev()
        .flat_map(|ty| {
            ty.members.iter().filter_map(move |m| match m {
                Member::Field(f) if !f.is_static && !f.is_const => Some(StorageSlot {
                    declaring_type: ty.name.clone(),
                    name: f.name.clone(),
                    ty: f.ty.clone(),
                }),
                Member::Property(p) if !p.is_static => Some(StorageSlot {
                    declaring_type: ty.name.clone(),
                    name: p.name.clone(),
                    ty: p.ty.clone(),
                }),
                _ => None,
            })
        })
        .collect()
}

/// Finds a field or property on a type or its base classes.
pub fn find_field<'t>(
    tree: &'t SyntaxTree,
    type_name: &str,
    name: &str,
) -> Option<(&'t TypeDecl, &'t Member)> {
    let mut current = tree.find_type(type_name);
    let mut depth = 0;
    while let Some(ty) = current {
        if let Some(member) = ty.member(name) {
            if !matches!(member, Member::Method(_)) {
                return Some((ty, member));
            }
        }
        depth += 1;
        if depth > tree.types.len() {
            return None;
        }
        current = ty.base.as_deref().and_then(|b| tree.find_type(b));
    }
    None
}

/// The operand type of a binary integer operation. A literal adopts the
/// other operand's type; otherwise the operands are promoted.
pub fn operand_type(lhs: &Expr, lhs_ty: IntType, rhs: &Expr, rhs_ty: IntType) -> IntType {
    match (lhs.is_literal(), rhs.is_literal()) {
        (true, false) => rhs_ty,
        (false, true) => lhs_ty,
        _ => lhs_ty.promote(rhs_ty),
    }
}

/// Returns `true` for types whose values callees may modify in place:
/// arrays and classes. Structs and scalars pass by value.
pub fn is_reference_type(tree: &SyntaxTree, ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Array { .. } => true,
        TypeRef::Named(name) => tree
            .find_type(name)
            .is_some_and(|t| t.kind != foundry_ast::TypeKind::Struct),
        _ => false,
    }
}

/// Local variable and parameter types of one method.
#[derive(Debug)]
pub struct Scope<'a> {
    tree: &'a SyntaxTree,
    member: String,
    this_type: Option<String>,
    locals: HashMap<String, TypeRef>,
}

struct LocalCollector<'m> {
    locals: &'m mut HashMap<String, TypeRef>,
}

impl Visitor for LocalCollector<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Local { name, ty, .. } = stmt {
            self.locals.insert(name.clone(), ty.clone());
        }
        walk_stmt(self, stmt);
    }
}

impl<'a> Scope<'a> {
    /// Collects the parameters and locals of `method`.
    pub fn new(tree: &'a SyntaxTree, owner: &TypeDecl, method: &MethodDecl) -> Self {
        let mut locals: HashMap<String, TypeRef> = method
            .params
            .iter()
            .map(|p| (p.name.clone(), p.ty.clone()))
            .collect();
        if let Some(body) = &method.body {
            let mut collector = LocalCollector {
                locals: &mut locals,
            };
            foundry_ast::visit::walk_block(&mut collector, body);
        }
        Self {
            tree,
            member: foundry_ast::member_full_name(&owner.name, &method.name),
            this_type: method.is_instance().then(|| owner.name.clone()),
            locals,
        }
    }

    /// The full name of the method.
    pub fn member(&self) -> &str {
        &self.member
    }

    /// The syntax tree.
    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    /// The declared type of a local or parameter.
    pub fn local_type(&self, name: &str) -> Option<&TypeRef> {
        self.locals.get(name)
    }

    fn unknown(&self, what: String) -> TransformError {
        TransformError::internal(format!("{what} in `{}`", self.member))
    }

    /// The static type of an expression. `null` has type [`TypeRef::Void`].
    pub fn type_of(&self, expr: &Expr) -> Result<TypeRef, TransformError> {
        Ok(match expr {
            Expr::Literal(Literal::Int { ty, .. }) => TypeRef::Int(*ty),
            Expr::Literal(Literal::Bool(_)) => TypeRef::Bool,
            Expr::Literal(Literal::Null) => TypeRef::Void,
            Expr::Local(name) => self
                .locals
                .get(name)
                .cloned()
                .ok_or_else(|| self.unknown(format!("unknown local `{name}`")))?,
            Expr::This => match &self.this_type {
                Some(name) => TypeRef::Named(name.clone()),
                None => return Err(self.unknown("`this` in a static member".to_string())),
            },
            Expr::Field {
                type_name, name, ..
            }
            | Expr::StaticField { type_name, name } => find_field(self.tree, type_name, name)
                .map(|(_, m)| m.value_type().clone())
                .ok_or_else(|| self.unknown(format!("unknown field `{type_name}.{name}`")))?,
            Expr::ArrayElement { array, .. } => match self.type_of(array)? {
                TypeRef::Array { element, .. } => *element,
                other => return Err(self.unknown(format!("indexing a non-array `{other}`"))),
            },
            Expr::ArrayLength(_) => TypeRef::Int(IntType::I32),
            Expr::Binary { op, lhs, rhs } => {
                if op.is_comparison() || op.is_logical() {
                    TypeRef::Bool
                } else {
                    let (l, r) = (self.type_of(lhs)?, self.type_of(rhs)?);
                    match (l.as_int(), r.as_int()) {
                        (Some(a), Some(_)) if op.is_shift() => TypeRef::Int(a),
                        (Some(a), Some(b)) => TypeRef::Int(operand_type(lhs, a, rhs, b)),
                        _ if matches!(op, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
                            && l == TypeRef::Bool =>
                        {
                            TypeRef::Bool
                        }
                        _ => {
                            return Err(self.unknown(format!(
                                "operator `{op}` on `{l}` and `{r}`"
                            )))
                        }
                    }
                }
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::LogicNot => TypeRef::Bool,
                UnaryOp::Neg | UnaryOp::Not => self.type_of(operand)?,
            },
            Expr::Cast { ty, .. } => ty.clone(),
            Expr::Call { method, .. } => self
                .tree
                .find_method(method)
                .map(|(_, m)| m.return_type.clone())
                .ok_or_else(|| self.unknown(format!("unknown method `{method}`")))?,
            Expr::New { type_name, .. } => TypeRef::Named(type_name.clone()),
            Expr::NewArray { element, .. } => TypeRef::array(element.clone()),
            Expr::MemoryRead { .. } => TypeRef::Int(IntType::U32),
            Expr::StartTask { method, .. } => {
                let ret = self
                    .tree
                    .find_method(method)
                    .map(|(_, m)| m.return_type.clone())
                    .ok_or_else(|| self.unknown(format!("unknown method `{method}`")))?;
                TypeRef::Task(Box::new(ret))
            }
            Expr::TaskResult(task) => match self.type_of(task)? {
                TypeRef::Task(inner) => *inner,
                other => return Err(self.unknown(format!("result of a non-task `{other}`"))),
            },
            Expr::Conditional {
                then, otherwise, ..
            } => {
                if then.is_literal() {
                    self.type_of(otherwise)?
                } else {
                    self.type_of(then)?
                }
            }
        })
    }

    /// The array holder an expression reads from, if it names storage.
    pub fn holder_of(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Local(name) => Some(local_holder(&self.member, name)),
            Expr::Field {
                type_name, name, ..
            }
            | Expr::StaticField { type_name, name } => {
                let (owner, _) = find_field(self.tree, type_name, name)?;
                Some(field_holder(&owner.name, name))
            }
            Expr::Call { method, .. } => Some(return_holder(method)),
            Expr::Conditional { then, .. } => self.holder_of(then),
            _ => None,
        }
    }
}

/// Maps source types to hardware data types.
#[derive(Debug, Clone, Copy)]
pub struct HardwareTypes<'a> {
    tree: &'a SyntaxTree,
    arrays: &'a ArraySizeTable,
}

impl<'a> HardwareTypes<'a> {
    /// Creates a mapping over a tree and its resolved array lengths.
    pub fn new(tree: &'a SyntaxTree, arrays: &'a ArraySizeTable) -> Self {
        Self { tree, arrays }
    }

    /// The hardware type of a value of type `ty` stored in `holder`.
    ///
    /// Returns `None` for types without a hardware value: `void`, the memory
    /// handle, tasks and objects without instance storage.
    pub fn data_type(
        &self,
        ty: &TypeRef,
        holder: &str,
        declaration: &str,
    ) -> Result<Option<DataType>, TransformError> {
        Ok(match ty {
            TypeRef::Void | TypeRef::Memory | TypeRef::Task(_) => None,
            TypeRef::Bool => Some(DataType::Boolean),
            TypeRef::Int(t) => Some(DataType::int(t.bits, t.signed)),
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
                let Some(element) = self.data_type(element, holder, declaration)? else {
                    return Ok(None);
                };
                let length = self.arrays.require(holder, declaration)?;
                Some(DataType::array(element, length))
            }
            TypeRef::Named(name) => self.record_type(name, declaration)?,
        })
    }

    /// The record type of an object, or `None` if it has no instance storage.
    pub fn record_type(
        &self,
        type_name: &str,
        declaration: &str,
    ) -> Result<Option<DataType>, TransformError> {
        let mut fields = Vec::new();
        for slot in storage_of(self.tree, type_name) {
            let holder = field_holder(&slot.declaring_type, &slot.name);
            if let Some(ty) = self.data_type(&slot.ty, &holder, declaration)? {
                fields.push((slot.name, ty));
            }
        }
        Ok((!fields.is_empty()).then(|| DataType::Record {
            name: type_name.to_string(),
            fields,
        }))
    }
}
