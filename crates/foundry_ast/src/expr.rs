//! Expressions inside method bodies.

use crate::types::{IntType, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    LogicAnd,
    /// `||`
    LogicOr,
}

impl BinaryOp {
    /// Returns `true` for operators producing `bool` from integer operands.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Returns `true` for the short-circuit boolean operators.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicAnd | BinaryOp::LogicOr)
    }

    /// Returns `true` for shifts, whose result takes the left operand's type.
    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
        };
        f.write_str(s)
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation (`-x`).
    Neg,
    /// Bitwise complement (`~x`).
    Not,
    /// Boolean negation (`!x`).
    LogicNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "~",
            UnaryOp::LogicNot => "!",
        })
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    /// An integer literal of a given type.
    Int {
        /// The value, already in range for `ty`.
        value: i128,
        /// The static type of the literal.
        ty: IntType,
    },
    /// `true` or `false`.
    Bool(bool),
    /// `null`.
    Null,
}

/// An expression with its operands.
///
/// Calls name their target by full member name. Instance calls carry the
/// receiver; static calls do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// A literal constant.
    Literal(Literal),
    /// A local variable or parameter of the enclosing method.
    Local(String),
    /// The receiver of an instance member.
    This,
    /// An instance field or auto-property of `target`.
    Field {
        /// The object holding the field.
        target: Box<Expr>,
        /// Full name of the type declaring the field.
        type_name: String,
        /// Field name.
        name: String,
    },
    /// A static field of a type.
    StaticField {
        /// Full name of the declaring type.
        type_name: String,
        /// Field name.
        name: String,
    },
    /// `array[index]`.
    ArrayElement {
        /// The array.
        array: Box<Expr>,
        /// The element index.
        index: Box<Expr>,
    },
    /// `array.Length`.
    ArrayLength(Box<Expr>),
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A numeric conversion.
    Cast {
        /// Target type.
        ty: TypeRef,
        /// Converted value.
        operand: Box<Expr>,
    },
    /// A method invocation.
    Call {
        /// Full name of the invoked method (`Ns.Type::Method`).
        method: String,
        /// The receiver for instance methods.
        receiver: Option<Box<Expr>>,
        /// Arguments in parameter order.
        args: Vec<Expr>,
        /// Whether the call dispatches virtually.
        is_virtual: bool,
    },
    /// Object creation, running the type's constructor if it has one.
    New {
        /// Full name of the created type.
        type_name: String,
        /// Constructor arguments.
        args: Vec<Expr>,
    },
    /// Array creation.
    NewArray {
        /// Element type.
        element: TypeRef,
        /// Number of elements.
        length: Box<Expr>,
    },
    /// Reads one 32-bit cell of shared memory.
    MemoryRead {
        /// The memory handle.
        memory: Box<Expr>,
        /// The cell index.
        cell_index: Box<Expr>,
    },
    /// Starts `method` as a task with a single argument.
    StartTask {
        /// Full name of the started method.
        method: String,
        /// The task argument.
        argument: Box<Expr>,
    },
    /// The result of a completed task.
    TaskResult(Box<Expr>),
    /// `condition ? then : otherwise`.
    Conditional {
        /// Selector.
        condition: Box<Expr>,
        /// Value when the condition holds.
        then: Box<Expr>,
        /// Value otherwise.
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// Returns the literal integer value, if this is an integer literal.
    pub fn as_int_literal(&self) -> Option<(i128, IntType)> {
        match self {
            Expr::Literal(Literal::Int { value, ty }) => Some((*value, *ty)),
            _ => None,
        }
    }

    /// Returns the literal boolean value, if this is a boolean literal.
    pub fn as_bool_literal(&self) -> Option<bool> {
        match self {
            Expr::Literal(Literal::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Returns `true` if this is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    /// Returns the local variable name, if this is a local reference.
    pub fn as_local(&self) -> Option<&str> {
        match self {
            Expr::Local(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_classes() {
        assert!(BinaryOp::Lt.is_comparison());
        assert!(!BinaryOp::Add.is_comparison());
        assert!(BinaryOp::LogicOr.is_logical());
        assert!(BinaryOp::Shr.is_shift());
    }

    #[test]
    fn literal_accessors() {
        let e = Expr::Literal(Literal::Int {
            value: 5,
            ty: IntType::U32,
        });
        assert_eq!(e.as_int_literal(), Some((5, IntType::U32)));
        assert_eq!(e.as_bool_literal(), None);
        assert!(e.is_literal());
        assert_eq!(Expr::Local("x".into()).as_local(), Some("x"));
    }

    #[test]
    fn display_operators() {
        assert_eq!(BinaryOp::Shl.to_string(), "<<");
        assert_eq!(BinaryOp::LogicAnd.to_string(), "&&");
    }
}
