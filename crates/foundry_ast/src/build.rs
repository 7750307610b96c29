//! Terse constructors for building syntax trees by hand.
//!
//! The decompiler front-end produces trees directly; these helpers exist for
//! tests, fixtures and tools that synthesize programs.

use crate::decl::{
    FieldDecl, Member, MethodDecl, MethodKind, Modifiers, Param, PropertyDecl, TypeDecl, TypeKind,
    Visibility, CONSTRUCTOR_NAME,
};
use crate::expr::{BinaryOp, Expr, Literal, UnaryOp};
use crate::stmt::{Block, Stmt};
use crate::types::{IntType, TypeRef};

/// Incrementally assembles a [`TypeDecl`].
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    decl: TypeDecl,
}

impl TypeBuilder {
    fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            decl: TypeDecl {
                name: name.to_string(),
                kind,
                base: None,
                interfaces: Vec::new(),
                is_abstract: false,
                members: Vec::new(),
            },
        }
    }

    /// Sets the base class.
    pub fn base(mut self, name: &str) -> Self {
        self.decl.base = Some(name.to_string());
        self
    }

    /// Adds an implemented interface.
    pub fn implements(mut self, name: &str) -> Self {
        self.decl.interfaces.push(name.to_string());
        self
    }

    /// Marks the type abstract.
    pub fn abstract_type(mut self) -> Self {
        self.decl.is_abstract = true;
        self
    }

    /// Adds a mutable instance field.
    pub fn field(self, name: &str, ty: TypeRef) -> Self {
        self.member(Member::Field(FieldDecl {
            name: name.to_string(),
            ty,
            is_static: false,
            is_const: false,
            initializer: None,
        }))
    }

    /// Adds a mutable static field.
    pub fn static_field(self, name: &str, ty: TypeRef) -> Self {
        self.member(Member::Field(FieldDecl {
            name: name.to_string(),
            ty,
            is_static: true,
            is_const: false,
            initializer: None,
        }))
    }

    /// Adds a constant field with its value.
    pub fn const_field(self, name: &str, ty: TypeRef, value: Expr) -> Self {
        self.member(Member::Field(FieldDecl {
            name: name.to_string(),
            ty,
            is_static: true,
            is_const: true,
            initializer: Some(value),
        }))
    }

    /// Adds an instance auto-property.
    pub fn property(self, name: &str, ty: TypeRef, has_setter: bool) -> Self {
        self.member(Member::Property(PropertyDecl {
            name: name.to_string(),
            ty,
            is_static: false,
            has_setter,
        }))
    }

    /// Adds a method or constructor.
    pub fn method(self, method: MethodDecl) -> Self {
        self.member(Member::Method(method))
    }

    /// Adds an arbitrary member.
    pub fn member(mut self, member: Member) -> Self {
        self.decl.members.push(member);
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> TypeDecl {
        self.decl
    }
}

/// Starts a class declaration.
pub fn class(name: &str) -> TypeBuilder {
    TypeBuilder::new(name, TypeKind::Class)
}

/// Starts a struct declaration.
pub fn structure(name: &str) -> TypeBuilder {
    TypeBuilder::new(name, TypeKind::Struct)
}

/// Builds an interface from its abstract methods.
pub fn interface(name: &str, methods: Vec<MethodDecl>) -> TypeDecl {
    methods
        .into_iter()
        .fold(TypeBuilder::new(name, TypeKind::Interface), TypeBuilder::method)
        .build()
}

fn method(
    name: &str,
    params: Vec<Param>,
    return_type: TypeRef,
    body: Option<Block>,
    modifiers: Modifiers,
    visibility: Visibility,
) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        kind: MethodKind::Method,
        params,
        return_type,
        body,
        modifiers,
        visibility,
    }
}

/// A public static method.
pub fn public_static(name: &str, params: Vec<Param>, ret: TypeRef, body: Block) -> MethodDecl {
    let modifiers = Modifiers {
        is_static: true,
        ..Modifiers::default()
    };
    method(name, params, ret, Some(body), modifiers, Visibility::Public)
}

/// A private static method.
pub fn private_static(name: &str, params: Vec<Param>, ret: TypeRef, body: Block) -> MethodDecl {
    MethodDecl {
        visibility: Visibility::Private,
        ..public_static(name, params, ret, body)
    }
}

/// A public non-virtual instance method.
pub fn public_instance(name: &str, params: Vec<Param>, ret: TypeRef, body: Block) -> MethodDecl {
    method(name, params, ret, Some(body), Modifiers::default(), Visibility::Public)
}

/// A public virtual instance method.
pub fn virtual_method(name: &str, params: Vec<Param>, ret: TypeRef, body: Block) -> MethodDecl {
    let modifiers = Modifiers {
        is_virtual: true,
        ..Modifiers::default()
    };
    method(name, params, ret, Some(body), modifiers, Visibility::Public)
}

/// A public override of a virtual or abstract method.
pub fn override_method(name: &str, params: Vec<Param>, ret: TypeRef, body: Block) -> MethodDecl {
    let modifiers = Modifiers {
        is_override: true,
        ..Modifiers::default()
    };
    method(name, params, ret, Some(body), modifiers, Visibility::Public)
}

/// A public abstract method without a body.
pub fn abstract_method(name: &str, params: Vec<Param>, ret: TypeRef) -> MethodDecl {
    let modifiers = Modifiers {
        is_abstract: true,
        is_virtual: true,
        ..Modifiers::default()
    };
    method(name, params, ret, None, modifiers, Visibility::Public)
}

/// A public instance constructor.
pub fn constructor(params: Vec<Param>, body: Block) -> MethodDecl {
    MethodDecl {
        kind: MethodKind::Constructor,
        ..method(
            CONSTRUCTOR_NAME,
            params,
            TypeRef::Void,
            Some(body),
            Modifiers::default(),
            Visibility::Public,
        )
    }
}

/// A parameter.
pub fn param(name: &str, ty: TypeRef) -> Param {
    Param {
        name: name.to_string(),
        ty,
    }
}

/// `void`.
pub fn void() -> TypeRef {
    TypeRef::Void
}

/// `bool`.
pub fn bool_ty() -> TypeRef {
    TypeRef::Bool
}

/// `uint`.
pub fn u32_ty() -> TypeRef {
    TypeRef::Int(IntType::U32)
}

/// `int`.
pub fn i32_ty() -> TypeRef {
    TypeRef::Int(IntType::I32)
}

/// An integer type.
pub fn int_ty(ty: IntType) -> TypeRef {
    TypeRef::Int(ty)
}

/// A one-dimensional array.
pub fn array_ty(element: TypeRef) -> TypeRef {
    TypeRef::array(element)
}

/// A user type by full name.
pub fn named(name: &str) -> TypeRef {
    TypeRef::Named(name.to_string())
}

/// A task handle.
pub fn task_ty(result: TypeRef) -> TypeRef {
    TypeRef::Task(Box::new(result))
}

/// The shared memory handle.
pub fn memory_ty() -> TypeRef {
    TypeRef::Memory
}

/// An integer literal.
pub fn lit(value: i128, ty: IntType) -> Expr {
    Expr::Literal(Literal::Int { value, ty })
}

/// A `uint` literal.
pub fn u32_lit(value: u32) -> Expr {
    lit(i128::from(value), IntType::U32)
}

/// An `int` literal.
pub fn i32_lit(value: i32) -> Expr {
    lit(i128::from(value), IntType::I32)
}

/// A boolean literal.
pub fn boolean(value: bool) -> Expr {
    Expr::Literal(Literal::Bool(value))
}

/// `null`.
pub fn null() -> Expr {
    Expr::Literal(Literal::Null)
}

/// A local variable or parameter.
pub fn local(name: &str) -> Expr {
    Expr::Local(name.to_string())
}

/// `this`.
pub fn this() -> Expr {
    Expr::This
}

/// An instance field access.
pub fn field(target: Expr, type_name: &str, name: &str) -> Expr {
    Expr::Field {
        target: Box::new(target),
        type_name: type_name.to_string(),
        name: name.to_string(),
    }
}

/// A static field access.
pub fn static_field(type_name: &str, name: &str) -> Expr {
    Expr::StaticField {
        type_name: type_name.to_string(),
        name: name.to_string(),
    }
}

/// `array[index]`.
pub fn index(array: Expr, index: Expr) -> Expr {
    Expr::ArrayElement {
        array: Box::new(array),
        index: Box::new(index),
    }
}

/// `array.Length`.
pub fn length(array: Expr) -> Expr {
    Expr::ArrayLength(Box::new(array))
}

/// A binary operation.
pub fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// `lhs + rhs`.
pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinaryOp::Add, lhs, rhs)
}

/// `lhs - rhs`.
pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinaryOp::Sub, lhs, rhs)
}

/// `lhs * rhs`.
pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinaryOp::Mul, lhs, rhs)
}

/// `lhs % rhs`.
pub fn rem(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinaryOp::Rem, lhs, rhs)
}

/// `lhs < rhs`.
pub fn lt(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinaryOp::Lt, lhs, rhs)
}

/// `lhs == rhs`.
pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
    bin(BinaryOp::Eq, lhs, rhs)
}

/// A unary operation.
pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
    }
}

/// A numeric conversion.
pub fn cast(ty: TypeRef, operand: Expr) -> Expr {
    Expr::Cast {
        ty,
        operand: Box::new(operand),
    }
}

/// A static call.
pub fn call_static(method: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        method: method.to_string(),
        receiver: None,
        args,
        is_virtual: false,
    }
}

/// A non-virtual instance call.
pub fn call(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        method: method.to_string(),
        receiver: Some(Box::new(receiver)),
        args,
        is_virtual: false,
    }
}

/// A virtual instance call.
pub fn call_virtual(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        method: method.to_string(),
        receiver: Some(Box::new(receiver)),
        args,
        is_virtual: true,
    }
}

/// Object creation.
pub fn new_object(type_name: &str, args: Vec<Expr>) -> Expr {
    Expr::New {
        type_name: type_name.to_string(),
        args,
    }
}

/// Array creation.
pub fn new_array(element: TypeRef, length: Expr) -> Expr {
    Expr::NewArray {
        element,
        length: Box::new(length),
    }
}

/// A shared memory read.
pub fn memory_read(memory: Expr, cell_index: Expr) -> Expr {
    Expr::MemoryRead {
        memory: Box::new(memory),
        cell_index: Box::new(cell_index),
    }
}

/// Starts a task.
pub fn start_task(method: &str, argument: Expr) -> Expr {
    Expr::StartTask {
        method: method.to_string(),
        argument: Box::new(argument),
    }
}

/// The result of a task.
pub fn task_result(task: Expr) -> Expr {
    Expr::TaskResult(Box::new(task))
}

/// `condition ? then : otherwise`.
pub fn conditional(condition: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr::Conditional {
        condition: Box::new(condition),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    }
}

/// A local declaration.
pub fn declare(name: &str, ty: TypeRef, init: Option<Expr>) -> Stmt {
    Stmt::Local {
        name: name.to_string(),
        ty,
        init,
    }
}

/// An assignment.
pub fn assign(target: Expr, value: Expr) -> Stmt {
    Stmt::Assign { target, value }
}

/// An expression statement.
pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

/// A shared memory write.
pub fn memory_write(memory: Expr, cell_index: Expr, value: Expr) -> Stmt {
    Stmt::MemoryWrite {
        memory,
        cell_index,
        value,
    }
}

/// An `if` statement.
pub fn if_else(condition: Expr, then_branch: Block, else_branch: Option<Block>) -> Stmt {
    Stmt::If {
        condition,
        then_branch,
        else_branch,
    }
}

/// A `while` loop.
pub fn while_loop(condition: Expr, body: Block) -> Stmt {
    Stmt::While { condition, body }
}

/// A `for` loop.
pub fn for_loop(init: Block, condition: Expr, step: Block, body: Block) -> Stmt {
    Stmt::For {
        init,
        condition,
        step,
        body,
    }
}

/// `break`.
pub fn brk() -> Stmt {
    Stmt::Break
}

/// `return value`.
pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(Some(value))
}

/// `return`.
pub fn ret_void() -> Stmt {
    Stmt::Return(None)
}

/// Waits for every task in an array.
pub fn wait_all(tasks: Expr) -> Stmt {
    Stmt::WaitAll(tasks)
}
