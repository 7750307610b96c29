//! The syntax tree consumed by the Foundry compiler.
//!
//! The tree is produced by an external decompiler from managed bytecode and is
//! delivered fully typed: every local, parameter, field and literal carries
//! its static type. Names are fully qualified (`Ns.Type`) and members are
//! addressed as `Ns.Type::Member`.
//!
//! - [`decl`]: types, members, the [`SyntaxTree`] root
//! - [`types`]: type references and integer types
//! - [`expr`] / [`stmt`]: method bodies
//! - [`visit`]: read-only traversal
//! - [`build`]: terse constructors for tests and tools

#![warn(missing_docs)]

pub mod build;
pub mod decl;
pub mod expr;
pub mod stmt;
pub mod types;
pub mod visit;

pub use decl::{
    member_full_name, FieldDecl, Member, MethodDecl, MethodKind, Modifiers, Param, PropertyDecl,
    SyntaxTree, TypeDecl, TypeKind, Visibility,
};
pub use expr::{BinaryOp, Expr, Literal, UnaryOp};
pub use stmt::{Block, Stmt};
pub use types::{IntType, TypeRef};
pub use visit::{walk_block, walk_expr, walk_stmt, Visitor};
