//! Statements inside method bodies.

use crate::expr::Expr;
use crate::types::TypeRef;
use serde::{Deserialize, Serialize};

/// A sequence of statements.
pub type Block = Vec<Stmt>;

/// A statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stmt {
    /// A local variable declaration.
    Local {
        /// Variable name, unique within the method.
        name: String,
        /// Declared type.
        ty: TypeRef,
        /// Optional initial value.
        init: Option<Expr>,
    },
    /// `target = value` where `target` is a local, field or array element.
    Assign {
        /// The assigned location.
        target: Expr,
        /// The new value.
        value: Expr,
    },
    /// An expression evaluated for its side effects (usually a call).
    Expr(Expr),
    /// Writes one 32-bit cell of shared memory.
    MemoryWrite {
        /// The memory handle.
        memory: Expr,
        /// The cell index.
        cell_index: Expr,
        /// The written value.
        value: Expr,
    },
    /// `if (condition) { .. } else { .. }`.
    If {
        /// The condition.
        condition: Expr,
        /// Statements run when the condition holds.
        then_branch: Block,
        /// Statements run otherwise.
        else_branch: Option<Block>,
    },
    /// `while (condition) { .. }`.
    While {
        /// Loop condition, checked before every iteration.
        condition: Expr,
        /// Loop body.
        body: Block,
    },
    /// `for (init; condition; step) { .. }`.
    For {
        /// Statements run once before the loop.
        init: Block,
        /// Loop condition.
        condition: Expr,
        /// Statements run after every iteration.
        step: Block,
        /// Loop body.
        body: Block,
    },
    /// Leaves the innermost enclosing loop.
    Break,
    /// Returns from the method.
    Return(Option<Expr>),
    /// A nested block.
    Block(Block),
    /// Waits until every task in the array has completed.
    WaitAll(Expr),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_compare_structurally() {
        let a = Stmt::Return(Some(Expr::Local("x".into())));
        let b = Stmt::Return(Some(Expr::Local("x".into())));
        assert_eq!(a, b);
        assert_ne!(a, Stmt::Return(None));
    }
}
