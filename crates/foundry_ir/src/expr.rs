//! IR expressions.
//!
//! Operands of arithmetic operators always share the result's type; the
//! lowering inserts [`Expr::Convert`] where the source language promotes.

use crate::types::DataType;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication, truncated to the result width.
    Mul,
    /// Division, truncating toward zero.
    Div,
    /// Remainder with the sign of the dividend.
    Rem,
    /// Bitwise or boolean AND.
    And,
    /// Bitwise or boolean OR.
    Or,
    /// Bitwise or boolean XOR.
    Xor,
    /// Logical shift left.
    ShiftLeft,
    /// Shift right; arithmetic for signed operands.
    ShiftRight,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl BinaryOp {
    /// Returns `true` for operators producing a boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation of a signed vector.
    Neg,
    /// Bitwise or boolean complement.
    Not,
}

/// An expression evaluated inside a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// A constant.
    Literal(Value),
    /// The current value of a signal or input port.
    Signal(String),
    /// The current value of a process variable.
    Variable(String),
    /// An array element.
    Index {
        /// The array.
        base: Box<Expr>,
        /// The element index; any integer vector.
        index: Box<Expr>,
    },
    /// A record field.
    Field {
        /// The record.
        base: Box<Expr>,
        /// Field name.
        name: String,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
        /// Result type.
        ty: DataType,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
        /// Result type.
        ty: DataType,
    },
    /// A width or signedness conversion between integer vectors.
    Convert {
        /// The converted value.
        operand: Box<Expr>,
        /// Source type.
        from: DataType,
        /// Target type.
        to: DataType,
    },
}

impl Expr {
    /// A signal reference.
    pub fn signal(name: impl Into<String>) -> Self {
        Expr::Signal(name.into())
    }

    /// A variable reference.
    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    /// A boolean constant.
    pub fn bool(value: bool) -> Self {
        Expr::Literal(Value::Bool(value))
    }

    /// An integer constant.
    pub fn int(value: i128, width: u16, signed: bool) -> Self {
        Expr::Literal(Value::int(value, width, signed))
    }

    /// An enumeration variant.
    pub fn variant(name: impl Into<String>) -> Self {
        Expr::Literal(Value::Enum(name.into()))
    }

    /// A binary operation.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, ty: DataType) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        }
    }

    /// A comparison producing a boolean.
    pub fn compare(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(op, lhs, rhs, DataType::Boolean)
    }

    /// `lhs = rhs`.
    pub fn equals(lhs: Expr, rhs: Expr) -> Self {
        Expr::compare(BinaryOp::Eq, lhs, rhs)
    }

    /// Boolean negation.
    pub fn invert(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
            ty: DataType::Boolean,
        }
    }

    /// Boolean conjunction of every operand; `true` when empty.
    pub fn all(operands: Vec<Expr>) -> Self {
        Self::fold(operands, BinaryOp::And, true)
    }

    /// Boolean disjunction of every operand; `false` when empty.
    pub fn any(operands: Vec<Expr>) -> Self {
        Self::fold(operands, BinaryOp::Or, false)
    }

    fn fold(operands: Vec<Expr>, op: BinaryOp, empty: bool) -> Self {
        operands
            .into_iter()
            .reduce(|acc, e| Expr::binary(op, acc, e, DataType::Boolean))
            .unwrap_or(Expr::bool(empty))
    }

    /// An array element.
    pub fn index(base: Expr, index: Expr) -> Self {
        Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// A record field.
    pub fn field(base: Expr, name: impl Into<String>) -> Self {
        Expr::Field {
            base: Box::new(base),
            name: name.into(),
        }
    }

    /// Converts between integer vector types; identity when equal.
    pub fn convert(operand: Expr, from: DataType, to: DataType) -> Self {
        if from == to {
            return operand;
        }
        Expr::Convert {
            operand: Box::new(operand),
            from,
            to,
        }
    }

    /// Visits every signal name read by this expression.
    pub fn signals(&self, out: &mut Vec<String>) {
        match self {
            Expr::Signal(name) => out.push(name.clone()),
            Expr::Literal(_) | Expr::Variable(_) => {}
            Expr::Index { base, index } => {
                base.signals(out);
                index.signals(out);
            }
            Expr::Field { base, .. } => base.signals(out),
            Expr::Unary { operand, .. } | Expr::Convert { operand, .. } => operand.signals(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.signals(out);
                rhs.signals(out);
            }
        }
    }
}
