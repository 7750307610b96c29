//! IR statements.

use crate::expr::Expr;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// The assigned location of an [`Statement::Assign`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// A signal or output port.
    Signal(String),
    /// A process variable.
    Variable(String),
    /// An element of an array target.
    Index {
        /// The array.
        base: Box<Target>,
        /// The element index.
        index: Expr,
    },
    /// A field of a record target.
    Field {
        /// The record.
        base: Box<Target>,
        /// Field name.
        name: String,
    },
}

impl Target {
    /// A signal target.
    pub fn signal(name: impl Into<String>) -> Self {
        Target::Signal(name.into())
    }

    /// A variable target.
    pub fn variable(name: impl Into<String>) -> Self {
        Target::Variable(name.into())
    }

    /// Returns the name of the assigned signal or variable and whether it
    /// is a signal.
    pub fn root(&self) -> (&str, bool) {
        match self {
            Target::Signal(name) => (name, true),
            Target::Variable(name) => (name, false),
            Target::Index { base, .. } | Target::Field { base, .. } => base.root(),
        }
    }

    /// The same location read as an expression.
    pub fn to_expr(&self) -> Expr {
        match self {
            Target::Signal(name) => Expr::Signal(name.clone()),
            Target::Variable(name) => Expr::Variable(name.clone()),
            Target::Index { base, index } => Expr::index(base.to_expr(), index.clone()),
            Target::Field { base, name } => Expr::field(base.to_expr(), name.clone()),
        }
    }
}

/// One alternative of a [`Statement::Case`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseArm {
    /// The matched value.
    pub choice: Value,
    /// Statements run on a match.
    pub body: Vec<Statement>,
}

/// A sequential statement inside a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    /// Assigns a signal (`<=`) or a variable (`:=`).
    Assign {
        /// The assigned location.
        target: Target,
        /// The new value.
        value: Expr,
    },
    /// A two-way branch.
    If {
        /// The condition.
        condition: Expr,
        /// Statements run when the condition holds.
        then_body: Vec<Statement>,
        /// Statements run otherwise.
        else_body: Vec<Statement>,
    },
    /// A multi-way branch on a value.
    Case {
        /// The matched expression.
        subject: Expr,
        /// Alternatives in order.
        arms: Vec<CaseArm>,
        /// Statements run when no arm matches.
        default: Vec<Statement>,
    },
    /// A comment carried into the generated source.
    Comment(String),
}

impl Statement {
    /// An assignment.
    pub fn assign(target: Target, value: Expr) -> Self {
        Statement::Assign { target, value }
    }

    /// Assigns a signal.
    pub fn assign_signal(name: impl Into<String>, value: Expr) -> Self {
        Statement::assign(Target::signal(name), value)
    }

    /// Assigns a variable.
    pub fn assign_variable(name: impl Into<String>, value: Expr) -> Self {
        Statement::assign(Target::variable(name), value)
    }

    /// An `if` without an `else` branch.
    pub fn when(condition: Expr, then_body: Vec<Statement>) -> Self {
        Statement::If {
            condition,
            then_body,
            else_body: Vec::new(),
        }
    }

    /// An `if` with both branches.
    pub fn if_else(condition: Expr, then_body: Vec<Statement>, else_body: Vec<Statement>) -> Self {
        Statement::If {
            condition,
            then_body,
            else_body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_target_root() {
        let t = Target::Field {
            base: Box::new(Target::Index {
                base: Box::new(Target::variable("points")),
                index: Expr::int(1, 32, false),
            }),
            name: "X".into(),
        };
        assert_eq!(t.root(), ("points", false));
        assert!(matches!(t.to_expr(), Expr::Field { .. }));
    }
}
